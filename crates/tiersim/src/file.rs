//! File records and tier identifiers.

use std::fmt;

use serde::Serialize;

/// Position of a tier inside its storage manager.
///
/// Lower indices are faster tiers. Identifiers are minted by
/// [`StorageManager`](crate::StorageManager) at construction and are only
/// meaningful for the manager that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TierId(usize);

impl TierId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }

    /// Whether `self` sits above `other` in the hierarchy.
    pub fn is_faster_than(self, other: TierId) -> bool {
        self.0 < other.0
    }
}

impl fmt::Display for TierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tier#{}", self.0)
    }
}

/// One stored object.
///
/// Timestamps are simulated nanoseconds and never move backwards over the
/// life of a file. Records handed out in events are snapshots taken when the
/// event fired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct File {
    /// Fully qualified path, unique across every tier.
    pub path: String,
    /// Tier the file is resident on.
    pub tier: TierId,
    /// Size in bytes.
    pub size: u64,
    pub creation_time_ns: u64,
    pub last_modification_ns: u64,
    pub last_access_ns: u64,
}

impl File {
    /// A brand-new file with every timestamp set to `timestamp_ns`.
    pub fn new(path: impl Into<String>, tier: TierId, size: u64, timestamp_ns: u64) -> Self {
        Self {
            path: path.into(),
            tier,
            size,
            creation_time_ns: timestamp_ns,
            last_modification_ns: timestamp_ns,
            last_access_ns: timestamp_ns,
        }
    }

    /// A copy of this record resident on `tier`, metadata preserved.
    pub(crate) fn copied_to(&self, tier: TierId) -> Self {
        Self {
            tier,
            ..self.clone()
        }
    }

    pub(crate) fn touch(&mut self, timestamp_ns: u64, is_write: bool) {
        self.last_access_ns = self.last_access_ns.max(timestamp_ns);
        if is_write {
            self.last_modification_ns = self.last_modification_ns.max(timestamp_ns);
        }
    }

    /// Time since the last read or write.
    pub fn idle_ns(&self, now_ns: u64) -> u64 {
        now_ns.saturating_sub(self.last_access_ns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_file_stamps_all_times() {
        let file = File::new("/a", TierId::new(0), 10, 5);
        assert_eq!(file.creation_time_ns, 5);
        assert_eq!(file.last_modification_ns, 5);
        assert_eq!(file.last_access_ns, 5);
    }

    #[test]
    fn touch_never_moves_time_backwards() {
        let mut file = File::new("/a", TierId::new(0), 10, 100);

        file.touch(200, false);
        assert_eq!(file.last_access_ns, 200);
        assert_eq!(file.last_modification_ns, 100);

        file.touch(150, true);
        assert_eq!(file.last_access_ns, 200);
        assert_eq!(file.last_modification_ns, 150);
    }

    #[test]
    fn copy_keeps_metadata_and_changes_tier() {
        let mut file = File::new("/a", TierId::new(0), 10, 100);
        file.touch(300, true);

        let copy = file.copied_to(TierId::new(2));
        assert_eq!(copy.tier, TierId::new(2));
        assert_eq!(copy.size, 10);
        assert_eq!(copy.creation_time_ns, 100);
        assert_eq!(copy.last_modification_ns, 300);
        assert_eq!(copy.last_access_ns, 300);
    }

    #[test]
    fn tier_ordering() {
        assert!(TierId::new(0).is_faster_than(TierId::new(1)));
        assert!(!TierId::new(2).is_faster_than(TierId::new(1)));
        assert_eq!(TierId::new(3).to_string(), "tier#3");
    }
}
