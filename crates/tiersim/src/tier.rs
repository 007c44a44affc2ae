//! Capacity-bounded tiers and their cost model.
//!
//! A [`Tier`] is pure bookkeeping: its resident files, the running
//! `used_size` total, counters, and the linear latency + throughput cost
//! model. Lifecycle operations that must notify policies go through
//! [`StorageManager`](crate::StorageManager), which owns every tier and the
//! event bus.
//!
//! Capacity is advisory. `used_size` may exceed `max_size`; only the
//! nearly-full alert at `target_occupation` is raised.

use std::collections::BTreeMap;

use serde::Serialize;
use tiersim_config::TierConfig;

use crate::clock::{NS_PER_SEC, sec_to_ns};
use crate::error::StorageError;
use crate::file::{File, TierId};

/// Default alert threshold as a fraction of capacity.
pub const DEFAULT_TARGET_OCCUPATION: f64 = 0.9;

// ============================================================================
// Tier Specification
// ============================================================================

/// Static parameters of a tier, fixed at simulation setup.
#[derive(Debug, Clone, PartialEq)]
pub struct TierSpec {
    pub name: String,
    /// Capacity in bytes.
    pub max_size: u64,
    /// Per-operation overhead in seconds.
    pub latency_secs: f64,
    /// Bytes per second.
    pub throughput: f64,
    /// Fraction of `max_size` in `[0, 1)` that triggers the nearly-full alert.
    pub target_occupation: f64,
}

impl TierSpec {
    pub fn new(name: impl Into<String>, max_size: u64, latency_secs: f64, throughput: f64) -> Self {
        Self {
            name: name.into(),
            max_size,
            latency_secs,
            throughput,
            target_occupation: DEFAULT_TARGET_OCCUPATION,
        }
    }

    pub fn with_target_occupation(mut self, target_occupation: f64) -> Self {
        self.target_occupation = target_occupation;
        self
    }

    pub fn validate(&self) -> Result<(), StorageError> {
        let invalid = |reason: String| StorageError::InvalidTier {
            name: self.name.clone(),
            reason,
        };

        if !(self.throughput.is_finite() && self.throughput > 0.0) {
            return Err(invalid(format!(
                "throughput must be positive, got {}",
                self.throughput
            )));
        }
        if !(self.latency_secs.is_finite() && self.latency_secs >= 0.0) {
            return Err(invalid(format!(
                "latency must be non-negative, got {}",
                self.latency_secs
            )));
        }
        if !(0.0..1.0).contains(&self.target_occupation) {
            return Err(invalid(format!(
                "target occupation must be in [0, 1), got {}",
                self.target_occupation
            )));
        }
        Ok(())
    }
}

impl From<&TierConfig> for TierSpec {
    fn from(config: &TierConfig) -> Self {
        TierSpec::new(
            config.name.clone(),
            config.max_size,
            config.latency_secs,
            config.throughput,
        )
        .with_target_occupation(config.target_occupation)
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Per-tier counters collected over a run.
///
/// `reads` and `writes` count workload accesses only; data moved by
/// migrations shows up in the promotion and eviction counters. Time and byte
/// totals include both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TierStats {
    pub reads: u64,
    pub writes: u64,
    pub creates: u64,
    pub deletes: u64,
    /// Files migrated into this tier from a slower one.
    pub promotions_in: u64,
    /// Files migrated out of this tier to a faster one.
    pub promotions_out: u64,
    /// Files migrated into this tier from a faster one.
    pub evictions_in: u64,
    /// Files migrated out of this tier to a slower one.
    pub evictions_out: u64,
    pub time_reading_ns: u64,
    pub time_writing_ns: u64,
    pub bytes_read: u64,
    pub bytes_written: u64,
}

impl TierStats {
    /// Workload reads plus writes.
    pub fn io_count(&self) -> u64 {
        self.reads + self.writes
    }

    /// Every migration this tier took part in, either side.
    pub fn migration_io_count(&self) -> u64 {
        self.promotions_in + self.promotions_out + self.evictions_in + self.evictions_out
    }
}

// ============================================================================
// Tier
// ============================================================================

/// A bounded storage unit holding files.
#[derive(Debug, Clone)]
pub struct Tier {
    id: TierId,
    name: String,
    max_size: u64,
    used_size: u64,
    latency_ns: u64,
    throughput: f64,
    target_occupation: f64,
    /// Ordered so that iteration, and any policy built on it, is deterministic.
    content: BTreeMap<String, File>,
    stats: TierStats,
}

impl Tier {
    /// Builds a tier from a spec that already passed [`TierSpec::validate`].
    pub(crate) fn from_spec(id: TierId, spec: &TierSpec) -> Self {
        Self {
            id,
            name: spec.name.clone(),
            max_size: spec.max_size,
            used_size: 0,
            latency_ns: sec_to_ns(spec.latency_secs),
            throughput: spec.throughput,
            target_occupation: spec.target_occupation,
            content: BTreeMap::new(),
            stats: TierStats::default(),
        }
    }

    pub fn id(&self) -> TierId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    /// Sum of the sizes of every resident file.
    pub fn used_size(&self) -> u64 {
        self.used_size
    }

    pub fn free_space(&self) -> u64 {
        self.max_size.saturating_sub(self.used_size)
    }

    pub fn latency_ns(&self) -> u64 {
        self.latency_ns
    }

    pub fn throughput(&self) -> f64 {
        self.throughput
    }

    pub fn target_occupation(&self) -> f64 {
        self.target_occupation
    }

    pub fn stats(&self) -> &TierStats {
        &self.stats
    }

    /// Used fraction of capacity. May exceed 1.0.
    pub fn occupation(&self) -> f64 {
        if self.max_size == 0 {
            return if self.used_size == 0 { 0.0 } else { f64::INFINITY };
        }
        self.used_size as f64 / self.max_size as f64
    }

    /// Byte count at which the nearly-full alert fires.
    pub fn nearly_full_threshold(&self) -> f64 {
        self.max_size as f64 * self.target_occupation
    }

    pub fn is_nearly_full(&self) -> bool {
        self.used_size as f64 >= self.nearly_full_threshold()
    }

    pub fn is_overrun(&self) -> bool {
        self.used_size > self.max_size
    }

    pub fn has_file(&self, path: &str) -> bool {
        self.content.contains_key(path)
    }

    pub fn get_file(&self, path: &str) -> Option<&File> {
        self.content.get(path)
    }

    /// Resident files in path order.
    pub fn files(&self) -> impl Iterator<Item = &File> {
        self.content.values()
    }

    pub fn file_count(&self) -> usize {
        self.content.len()
    }

    /// Cost of moving `size` bytes: `latency + size / throughput`.
    pub fn transfer_ns(&self, size: u64) -> u64 {
        let bytes_ns = (size as f64 / self.throughput * NS_PER_SEC as f64).round() as u64;
        self.latency_ns.saturating_add(bytes_ns)
    }

    /// Cost of a metadata-only operation.
    pub fn metadata_ns(&self) -> u64 {
        self.latency_ns
    }

    /// Admits `file`, replacing any record under the same path.
    ///
    /// # Panics
    ///
    /// Panics if the resident sizes no longer fit in a `u64`.
    pub(crate) fn insert(&mut self, file: File) -> Option<File> {
        debug_assert_eq!(file.tier, self.id, "file admitted to the wrong tier");
        let size = file.size;
        let replaced = self.content.insert(file.path.clone(), file);
        if let Some(old) = &replaced {
            self.used_size -= old.size;
        }
        self.used_size = self
            .used_size
            .checked_add(size)
            .expect("tier used_size overflowed u64");
        replaced
    }

    pub(crate) fn remove(&mut self, path: &str) -> Option<File> {
        let file = self.content.remove(path)?;
        self.used_size -= file.size;
        Some(file)
    }

    /// Updates access times and returns a snapshot of the updated record.
    pub(crate) fn touch(&mut self, path: &str, timestamp_ns: u64, is_write: bool) -> Option<File> {
        let file = self.content.get_mut(path)?;
        file.touch(timestamp_ns, is_write);
        Some(file.clone())
    }

    pub(crate) fn stats_mut(&mut self) -> &mut TierStats {
        &mut self.stats
    }

    /// Recomputes `used_size` from the resident files.
    #[cfg(test)]
    pub(crate) fn recount(&self) -> u64 {
        self.content.values().map(|file| file.size).sum()
    }
}
