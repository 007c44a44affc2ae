//! The storage manager: tiers, the path namespace, event dispatch and
//! migration.
//!
//! Every lifecycle operation is routed through [`StorageManager`] so that
//! mutating a tier and firing the matching event happen in one place. The
//! manager also owns the [`Scheduler`], since firing an event is itself a
//! scheduling point.
//!
//! # Namespace
//!
//! A path is resident on at most one tier. [`StorageManager::get_file`] scans
//! tiers fastest first and is the single source of truth for existence.
//! Creating a path that lives on another tier is rejected; the only
//! dual-residency is the one inside [`StorageManager::migrate`], which never
//! escapes the call.

use tiersim_config::TiersimConfig;
use tracing::{debug, trace, warn};

use crate::error::StorageError;
use crate::event::{AccessCause, Delivery, EventBus, EventKind, StorageEvent, SubscriberId};
use crate::file::{File, TierId};
use crate::scheduler::{Priority, Scheduler};
use crate::sim::Action;
use crate::tier::{Tier, TierSpec};

/// Priority the kernel fires its own lifecycle events with.
pub const KERNEL_EVENT_PRIORITY: Priority = 0;

/// Owns every tier, the event bus and the scheduler.
#[derive(Debug)]
pub struct StorageManager {
    /// Fastest first.
    tiers: Vec<Tier>,
    default_tier: TierId,
    bus: EventBus,
    scheduler: Scheduler<Action>,
}

impl StorageManager {
    /// Builds a manager over `specs`, fastest tier first.
    pub fn new(specs: Vec<TierSpec>, default_tier_index: usize) -> Result<Self, StorageError> {
        if specs.is_empty() {
            return Err(StorageError::NoTiers);
        }
        if default_tier_index >= specs.len() {
            return Err(StorageError::DefaultTierOutOfRange {
                index: default_tier_index,
                tiers: specs.len(),
            });
        }

        let mut tiers = Vec::with_capacity(specs.len());
        for (index, spec) in specs.iter().enumerate() {
            spec.validate()?;
            tiers.push(Tier::from_spec(TierId::new(index), spec));
        }

        Ok(Self {
            tiers,
            default_tier: TierId::new(default_tier_index),
            bus: EventBus::new(),
            scheduler: Scheduler::new(),
        })
    }

    /// Builds a manager from the `[[tiers]]` and `[simulation]` sections.
    pub fn from_config(config: &TiersimConfig) -> Result<Self, StorageError> {
        let specs = config.tiers.iter().map(TierSpec::from).collect();
        Self::new(specs, config.simulation.default_tier_index)
    }

    // ------------------------------------------------------------------------
    // Topology
    // ------------------------------------------------------------------------

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    /// # Panics
    ///
    /// Panics if `id` was minted by another manager with more tiers.
    pub fn tier(&self, id: TierId) -> &Tier {
        &self.tiers[id.index()]
    }

    /// Handle for running lifecycle operations against one tier.
    pub fn tier_mut(&mut self, id: TierId) -> TierMut<'_> {
        assert!(id.index() < self.tiers.len(), "unknown {id}");
        TierMut { storage: self, id }
    }

    pub fn tier_ids(&self) -> impl Iterator<Item = TierId> + use<> {
        (0..self.tiers.len()).map(TierId::new)
    }

    pub fn tier_by_name(&self, name: &str) -> Option<TierId> {
        self.tiers.iter().find(|tier| tier.name() == name).map(Tier::id)
    }

    pub fn default_tier_id(&self) -> TierId {
        self.default_tier
    }

    /// The tier newly created files land on.
    pub fn get_default_tier(&self) -> &Tier {
        self.tier(self.default_tier)
    }

    /// The next tier down the hierarchy, if any.
    pub fn slower_tier(&self, id: TierId) -> Option<TierId> {
        let next = id.index() + 1;
        (next < self.tiers.len()).then(|| TierId::new(next))
    }

    /// Finds `path` on the fastest tier that holds it.
    pub fn get_file(&self, path: &str) -> Option<&File> {
        self.tiers.iter().find_map(|tier| tier.get_file(path))
    }

    // ------------------------------------------------------------------------
    // Scheduling and events
    // ------------------------------------------------------------------------

    #[inline]
    pub fn now(&self) -> u64 {
        self.scheduler.now()
    }

    pub fn scheduler(&self) -> &Scheduler<Action> {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler<Action> {
        &mut self.scheduler
    }

    pub fn events(&self) -> &EventBus {
        &self.bus
    }

    /// Attaches `id` to the next occurrence of `kind`. Idempotent.
    pub fn subscribe(&mut self, kind: EventKind, id: SubscriberId) -> bool {
        self.bus.subscribe(kind, id)
    }

    /// Fires `event`.
    ///
    /// The pending event for its kind is swapped for a fresh one and the old
    /// one is queued for delivery at the current instant under `priority`.
    /// Nothing is delivered synchronously. When nobody was subscribed the
    /// slot is still renewed but no delivery is queued.
    pub fn fire_event(&mut self, event: StorageEvent, priority: Priority) {
        let kind = event.kind();
        let pending = self.bus.rearm(kind);

        if pending.subscribers().is_empty() {
            trace!(
                kind = %kind,
                tier = %event.tier(),
                generation = pending.generation(),
                "event fired with no subscribers"
            );
            return;
        }

        trace!(
            kind = %kind,
            tier = %event.tier(),
            generation = pending.generation(),
            priority,
            subscribers = pending.subscribers().len(),
            "event fired"
        );
        self.scheduler.schedule_after_with_priority(
            0,
            priority,
            Action::Deliver(Delivery { event, pending }),
        );
    }

    // ------------------------------------------------------------------------
    // Lifecycle operations
    // ------------------------------------------------------------------------

    /// Creates `path` with `size` bytes on `tier` and returns the delay.
    ///
    /// Re-creating a path on the same tier replaces the old record. Fires
    /// `file_created`, then `tier_nearly_full` if the tier is at or above
    /// its target occupation afterwards.
    ///
    /// # Panics
    ///
    /// Panics if the tier's resident sizes no longer fit in a `u64`.
    pub fn create_file(
        &mut self,
        tier: TierId,
        timestamp_ns: u64,
        path: &str,
        size: u64,
    ) -> Result<u64, StorageError> {
        if let Some(existing) = self.get_file(path).filter(|file| file.tier != tier) {
            return Err(StorageError::AlreadyResident {
                path: path.to_owned(),
                tier: self.tier(existing.tier).name().to_owned(),
            });
        }

        let file = File::new(path, tier, size, timestamp_ns);
        Ok(self.admit(file, AccessCause::Workload))
    }

    /// Reads `path` from `tier`. Absent paths cost nothing and fire nothing.
    pub fn read_file(&mut self, tier: TierId, timestamp_ns: u64, path: &str) -> u64 {
        self.access(tier, timestamp_ns, path, false, AccessCause::Workload)
    }

    /// Writes `path` on `tier`. Absent paths cost nothing and fire nothing.
    pub fn write_file(&mut self, tier: TierId, timestamp_ns: u64, path: &str) -> u64 {
        self.access(tier, timestamp_ns, path, true, AccessCause::Workload)
    }

    /// Deletes `path` from `tier`. Absent paths cost nothing and fire nothing.
    pub fn delete_file(&mut self, tier: TierId, path: &str) -> u64 {
        self.remove(tier, path, AccessCause::Workload)
    }

    /// Moves `file` to `target` and returns the total delay.
    ///
    /// The copy is admitted on the target first, then both sides transfer
    /// the data concurrently (the slower side is charged), then the source
    /// record is deleted. A file already on `target` costs nothing.
    ///
    /// # Errors
    ///
    /// [`StorageError::NotResident`] if the tier named by `file.tier` no
    /// longer holds the path. Nothing is changed in that case.
    pub fn migrate(
        &mut self,
        file: &File,
        target: TierId,
        timestamp_ns: u64,
    ) -> Result<u64, StorageError> {
        let source = file.tier;
        if source == target {
            return Ok(0);
        }

        let Some(resident) = self.tier(source).get_file(&file.path) else {
            return Err(StorageError::NotResident {
                path: file.path.clone(),
                tier: self.tier(source).name().to_owned(),
            });
        };
        let copy = resident.copied_to(target);
        let path = copy.path.clone();

        let mut delay = self.admit(copy, AccessCause::Migration);
        let read = self.access(source, timestamp_ns, &path, false, AccessCause::Migration);
        let write = self.access(target, timestamp_ns, &path, true, AccessCause::Migration);
        delay = delay.saturating_add(read.max(write));
        delay = delay.saturating_add(self.remove(source, &path, AccessCause::Migration));

        if target.is_faster_than(source) {
            self.tiers[source.index()].stats_mut().promotions_out += 1;
            self.tiers[target.index()].stats_mut().promotions_in += 1;
        } else {
            self.tiers[source.index()].stats_mut().evictions_out += 1;
            self.tiers[target.index()].stats_mut().evictions_in += 1;
        }

        debug!(
            path = %path,
            source = self.tier(source).name(),
            target = self.tier(target).name(),
            delay_ns = delay,
            "migrated file"
        );
        Ok(delay)
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn admit(&mut self, file: File, cause: AccessCause) -> u64 {
        let id = file.tier;
        let size = file.size;
        let snapshot = file.clone();

        let tier = &mut self.tiers[id.index()];
        tier.insert(file);
        let delay = if size == 0 { 0 } else { tier.transfer_ns(size) };

        let stats = tier.stats_mut();
        if cause == AccessCause::Workload {
            stats.creates += 1;
        }
        stats.time_writing_ns = stats.time_writing_ns.saturating_add(delay);
        stats.bytes_written = stats.bytes_written.saturating_add(size);

        if tier.is_overrun() {
            warn!(
                tier = tier.name(),
                used_size = tier.used_size(),
                max_size = tier.max_size(),
                "tier capacity overrun"
            );
        }
        let nearly_full = tier.is_nearly_full();

        self.fire_event(
            StorageEvent::FileCreated {
                tier: id,
                file: snapshot,
            },
            KERNEL_EVENT_PRIORITY,
        );
        if nearly_full {
            self.fire_event(StorageEvent::TierNearlyFull { tier: id }, KERNEL_EVENT_PRIORITY);
        }
        delay
    }

    fn access(
        &mut self,
        id: TierId,
        timestamp_ns: u64,
        path: &str,
        is_write: bool,
        cause: AccessCause,
    ) -> u64 {
        let tier = &mut self.tiers[id.index()];
        let Some(file) = tier.touch(path, timestamp_ns, is_write) else {
            return 0;
        };
        let delay = tier.transfer_ns(file.size);

        let stats = tier.stats_mut();
        if is_write {
            if cause == AccessCause::Workload {
                stats.writes += 1;
            }
            stats.time_writing_ns = stats.time_writing_ns.saturating_add(delay);
            stats.bytes_written = stats.bytes_written.saturating_add(file.size);
        } else {
            if cause == AccessCause::Workload {
                stats.reads += 1;
            }
            stats.time_reading_ns = stats.time_reading_ns.saturating_add(delay);
            stats.bytes_read = stats.bytes_read.saturating_add(file.size);
        }

        self.fire_event(
            StorageEvent::FileAccessed {
                tier: id,
                file,
                is_write,
                cause,
            },
            KERNEL_EVENT_PRIORITY,
        );
        delay
    }

    fn remove(&mut self, id: TierId, path: &str, cause: AccessCause) -> u64 {
        let tier = &mut self.tiers[id.index()];
        let Some(file) = tier.remove(path) else {
            return 0;
        };
        let delay = tier.metadata_ns();
        if cause == AccessCause::Workload {
            tier.stats_mut().deletes += 1;
        }

        self.fire_event(StorageEvent::FileDeleted { tier: id, file }, KERNEL_EVENT_PRIORITY);
        delay
    }
}

/// Lifecycle operations bound to one tier.
///
/// ```text
/// storage.tier_mut(ssd).create_file(0, "/a", 50)?;
/// ```
pub struct TierMut<'a> {
    storage: &'a mut StorageManager,
    id: TierId,
}

impl TierMut<'_> {
    pub fn id(&self) -> TierId {
        self.id
    }

    pub fn create_file(
        &mut self,
        timestamp_ns: u64,
        path: &str,
        size: u64,
    ) -> Result<u64, StorageError> {
        self.storage.create_file(self.id, timestamp_ns, path, size)
    }

    pub fn read_file(&mut self, timestamp_ns: u64, path: &str) -> u64 {
        self.storage.read_file(self.id, timestamp_ns, path)
    }

    pub fn write_file(&mut self, timestamp_ns: u64, path: &str) -> u64 {
        self.storage.write_file(self.id, timestamp_ns, path)
    }

    pub fn delete_file(&mut self, path: &str) -> u64 {
        self.storage.delete_file(self.id, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tier::TierStats;

    const WATCHER: SubscriberId = SubscriberId::new(0);

    fn two_tiers() -> StorageManager {
        StorageManager::new(
            vec![
                TierSpec::new("SSD", 100, 1e-4, 2e9),
                TierSpec::new("HDD", 1_000, 1e-2, 2.5e8),
            ],
            0,
        )
        .unwrap()
    }

    fn watch_all(storage: &mut StorageManager) {
        for kind in EventKind::ALL {
            storage.subscribe(kind, WATCHER);
        }
    }

    /// Pops every queued action and returns the delivered events.
    fn delivered(storage: &mut StorageManager) -> Vec<StorageEvent> {
        let mut events = Vec::new();
        while let Some(scheduled) = storage.scheduler_mut().pop() {
            if let Action::Deliver(delivery) = scheduled.action {
                events.push(delivery.event);
            }
        }
        events
    }

    #[test]
    fn construction_errors() {
        assert_eq!(
            StorageManager::new(vec![], 0).unwrap_err(),
            StorageError::NoTiers
        );
        assert_eq!(
            StorageManager::new(vec![TierSpec::new("SSD", 1, 0.0, 1.0)], 1).unwrap_err(),
            StorageError::DefaultTierOutOfRange { index: 1, tiers: 1 }
        );
        assert!(matches!(
            StorageManager::new(vec![TierSpec::new("SSD", 1, 0.0, 0.0)], 0),
            Err(StorageError::InvalidTier { .. })
        ));
    }

    #[test]
    fn default_config_builds_three_tiers() {
        let storage = StorageManager::from_config(&TiersimConfig::default()).unwrap();
        let names: Vec<_> = storage.tiers().iter().map(Tier::name).collect();
        assert_eq!(names, ["SSD", "HDD", "Tapes"]);
        assert_eq!(storage.get_default_tier().name(), "SSD");
        assert_eq!(storage.tier_by_name("HDD"), Some(TierId::new(1)));
        assert_eq!(storage.slower_tier(TierId::new(2)), None);
    }

    #[test]
    fn create_accounts_size_and_fires_created() {
        let mut storage = two_tiers();
        watch_all(&mut storage);
        let ssd = storage.default_tier_id();

        let delay = storage.tier_mut(ssd).create_file(0, "/a", 50).unwrap();

        assert_eq!(delay, 100_025);
        assert_eq!(storage.tier(ssd).used_size(), 50);
        let events = delivered(&mut storage);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind(), EventKind::FileCreated);
        assert_eq!(events[0].file().map(|f| f.path.as_str()), Some("/a"));
    }

    #[test]
    fn reaching_target_occupation_fires_nearly_full_after_created() {
        let mut storage = two_tiers();
        let ssd = storage.default_tier_id();
        storage.create_file(ssd, 0, "/a", 50).unwrap();
        watch_all(&mut storage);

        storage.create_file(ssd, 1, "/b", 40).unwrap();

        let kinds: Vec<_> = delivered(&mut storage).iter().map(StorageEvent::kind).collect();
        assert_eq!(kinds, [EventKind::FileCreated, EventKind::TierNearlyFull]);
    }

    #[test]
    fn zero_size_create_is_free() {
        let mut storage = two_tiers();
        let ssd = storage.default_tier_id();
        assert_eq!(storage.create_file(ssd, 0, "/empty", 0).unwrap(), 0);
        assert!(storage.get_file("/empty").is_some());
    }

    #[test]
    fn create_on_another_tier_is_rejected() {
        let mut storage = two_tiers();
        let hdd = TierId::new(1);
        storage.create_file(hdd, 0, "/a", 10).unwrap();

        let err = storage.create_file(storage.default_tier_id(), 1, "/a", 10).unwrap_err();
        assert!(matches!(err, StorageError::AlreadyResident { ref tier, .. } if tier == "HDD"));
        assert_eq!(storage.tier(TierId::new(0)).file_count(), 0);
    }

    #[test]
    fn recreate_on_same_tier_replaces() {
        let mut storage = two_tiers();
        let ssd = storage.default_tier_id();
        storage.create_file(ssd, 0, "/a", 30).unwrap();
        storage.create_file(ssd, 5, "/a", 10).unwrap();

        assert_eq!(storage.tier(ssd).used_size(), 10);
        assert_eq!(storage.get_file("/a").unwrap().creation_time_ns, 5);
    }

    #[test]
    fn missing_path_operations_are_silent() {
        let mut storage = two_tiers();
        watch_all(&mut storage);
        let ssd = storage.default_tier_id();

        assert_eq!(storage.read_file(ssd, 7, "/missing"), 0);
        assert_eq!(storage.write_file(ssd, 7, "/missing"), 0);
        assert_eq!(storage.delete_file(ssd, "/missing"), 0);

        assert!(storage.scheduler().is_empty());
        assert_eq!(storage.tier(ssd).used_size(), 0);
        assert_eq!(storage.tier(ssd).stats(), &TierStats::default());
        for kind in EventKind::ALL {
            assert!(storage.events().is_subscribed(kind, WATCHER));
        }
    }

    #[test]
    fn stale_delete_then_read_is_a_noop() {
        let mut storage = two_tiers();
        let ssd = storage.default_tier_id();
        storage.create_file(ssd, 0, "/a", 10).unwrap();
        assert_eq!(storage.delete_file(ssd, "/a"), 100_000);
        delivered(&mut storage);
        watch_all(&mut storage);

        assert_eq!(storage.delete_file(ssd, "/a"), 0);
        assert_eq!(storage.read_file(ssd, 3, "/a"), 0);
        assert!(delivered(&mut storage).is_empty());
        assert!(storage.get_file("/a").is_none());
    }

    #[test]
    fn access_updates_times_and_counts_workload() {
        let mut storage = two_tiers();
        let ssd = storage.default_tier_id();
        storage.create_file(ssd, 10, "/a", 20).unwrap();

        storage.read_file(ssd, 30, "/a");
        storage.write_file(ssd, 20, "/a");

        let file = storage.get_file("/a").unwrap();
        assert_eq!(file.last_access_ns, 30);
        assert_eq!(file.last_modification_ns, 20);
        let stats = storage.tier(ssd).stats();
        assert_eq!((stats.reads, stats.writes, stats.creates), (1, 1, 1));
        assert_eq!(stats.bytes_read, 20);
    }

    #[test]
    fn migrate_moves_size_between_tiers() {
        let mut storage = two_tiers();
        let (ssd, hdd) = (TierId::new(0), TierId::new(1));
        storage.create_file(ssd, 0, "/a", 10).unwrap();
        let file = storage.get_file("/a").unwrap().clone();

        let delay = storage.migrate(&file, hdd, 10).unwrap();

        assert_eq!(storage.tier(ssd).used_size(), 0);
        assert_eq!(storage.tier(hdd).used_size(), 10);
        assert!(!storage.tier(ssd).has_file("/a"));
        assert_eq!(storage.get_file("/a").unwrap().tier, hdd);

        let expected = storage.tier(hdd).transfer_ns(10)
            + storage.tier(hdd).transfer_ns(10).max(storage.tier(ssd).transfer_ns(10))
            + storage.tier(ssd).metadata_ns();
        assert_eq!(delay, expected);

        assert_eq!(storage.tier(ssd).stats().evictions_out, 1);
        assert_eq!(storage.tier(hdd).stats().evictions_in, 1);
        assert_eq!(storage.tier(hdd).stats().creates, 0);
        assert_eq!(storage.tier(hdd).stats().writes, 0);
    }

    #[test]
    fn migrate_preserves_metadata() {
        let mut storage = two_tiers();
        let (ssd, hdd) = (TierId::new(0), TierId::new(1));
        storage.create_file(hdd, 4, "/a", 10).unwrap();
        storage.write_file(hdd, 8, "/a");
        let file = storage.get_file("/a").unwrap().clone();

        storage.migrate(&file, ssd, 8).unwrap();

        let moved = storage.get_file("/a").unwrap();
        assert_eq!(moved.tier, ssd);
        assert_eq!(moved.creation_time_ns, 4);
        assert_eq!(moved.last_modification_ns, 8);
        assert_eq!(storage.tier(ssd).stats().promotions_in, 1);
        assert_eq!(storage.tier(hdd).stats().promotions_out, 1);
    }

    #[test]
    fn migrate_to_current_tier_is_idempotent() {
        let mut storage = two_tiers();
        let ssd = storage.default_tier_id();
        storage.create_file(ssd, 0, "/a", 10).unwrap();
        let file = storage.get_file("/a").unwrap().clone();
        let queued = storage.scheduler().len();

        assert_eq!(storage.migrate(&file, ssd, 1).unwrap(), 0);
        assert_eq!(storage.tier(ssd).used_size(), 10);
        assert_eq!(storage.scheduler().len(), queued);
    }

    #[test]
    fn stale_migration_is_rejected_without_changes() {
        let mut storage = two_tiers();
        let (ssd, hdd) = (TierId::new(0), TierId::new(1));
        storage.create_file(ssd, 0, "/a", 10).unwrap();
        let stale = storage.get_file("/a").unwrap().clone();
        storage.migrate(&stale, hdd, 1).unwrap();

        let err = storage.migrate(&stale, hdd, 2).unwrap_err();

        assert!(matches!(err, StorageError::NotResident { .. }));
        assert_eq!(storage.tier(hdd).used_size(), 10);
        assert_eq!(storage.tier(ssd).used_size(), 0);
    }

    #[test]
    fn migration_events_are_tagged_with_their_cause() {
        let mut storage = two_tiers();
        let (ssd, hdd) = (TierId::new(0), TierId::new(1));
        storage.create_file(ssd, 0, "/a", 10).unwrap();
        delivered(&mut storage);
        watch_all(&mut storage);
        let file = storage.get_file("/a").unwrap().clone();

        storage.migrate(&file, hdd, 1).unwrap();

        let events = delivered(&mut storage);
        let kinds: Vec<_> = events.iter().map(StorageEvent::kind).collect();
        // one-shot subscriptions: the second access in the migration finds
        // the slot already renewed and nobody listening
        assert_eq!(
            kinds,
            [EventKind::FileCreated, EventKind::FileAccessed, EventKind::FileDeleted]
        );
        assert!(matches!(
            events[1],
            StorageEvent::FileAccessed { cause: AccessCause::Migration, is_write: false, tier, .. }
                if tier == ssd
        ));
    }

    #[test]
    fn lower_priority_is_delivered_first_at_the_same_instant() {
        let mut storage = two_tiers();
        let ssd = storage.default_tier_id();

        storage.subscribe(EventKind::TierNearlyFull, WATCHER);
        storage.fire_event(StorageEvent::TierNearlyFull { tier: ssd }, 5);
        storage.subscribe(EventKind::FileDeleted, WATCHER);
        let file = File::new("/x", ssd, 1, 0);
        storage.fire_event(StorageEvent::FileDeleted { tier: ssd, file }, 1);

        let kinds: Vec<_> = delivered(&mut storage).iter().map(StorageEvent::kind).collect();
        assert_eq!(kinds, [EventKind::FileDeleted, EventKind::TierNearlyFull]);
        assert_eq!(storage.now(), 0);
    }

    #[test]
    fn firing_renews_the_slot_even_without_subscribers() {
        let mut storage = two_tiers();
        let ssd = storage.default_tier_id();

        storage.fire_event(StorageEvent::TierNearlyFull { tier: ssd }, 0);

        assert!(storage.scheduler().is_empty());
        assert_eq!(storage.events().pending(EventKind::TierNearlyFull).generation(), 1);
    }

    #[test]
    fn byte_and_time_counters_saturate() {
        let mut storage = two_tiers();
        let ssd = storage.default_tier_id();

        storage.create_file(ssd, 0, "/huge", u64::MAX).unwrap();
        storage.read_file(ssd, 1, "/huge");
        storage.read_file(ssd, 2, "/huge");

        let stats = storage.tier(ssd).stats();
        assert_eq!(stats.reads, 2);
        assert_eq!(stats.bytes_read, u64::MAX);
        assert_eq!(stats.bytes_written, u64::MAX);
        assert_eq!(stats.time_reading_ns, u64::MAX);
        assert_eq!(storage.tier(ssd).used_size(), u64::MAX);
    }

    #[test]
    #[should_panic(expected = "used_size overflowed")]
    fn used_size_overflow_panics() {
        let mut storage = two_tiers();
        let ssd = storage.default_tier_id();

        storage.create_file(ssd, 0, "/huge", u64::MAX).unwrap();
        storage.create_file(ssd, 1, "/one-more", 1).unwrap();
    }
}
