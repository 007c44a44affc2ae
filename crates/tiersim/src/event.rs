//! Storage lifecycle events and the one-shot subscription bus.
//!
//! Each [`EventKind`] has exactly one live [`PendingEvent`]: the next
//! occurrence of that kind. Subscribers attach to it. Firing swaps in a fresh
//! pending event and hands the old one, with the payload, to the scheduler
//! for deferred delivery. A subscriber that wants further occurrences must
//! subscribe again once it has been notified.
//!
//! ```text
//!  subscribe(A) ─┐          fire(e1)                 deliver(e1)
//!                ▼             │                         │
//!   slot: [gen 0: A] ──swap──► [gen 1: -]   A notified ──┘──► A re-subscribes
//!                              gen 0 queued                    slot: [gen 1: A]
//! ```

use std::fmt;

use crate::file::{File, TierId};

/// The four kinds of notification the kernel emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventKind {
    FileCreated,
    FileAccessed,
    FileDeleted,
    TierNearlyFull,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::FileCreated,
        EventKind::FileAccessed,
        EventKind::FileDeleted,
        EventKind::TierNearlyFull,
    ];

    fn slot(self) -> usize {
        match self {
            EventKind::FileCreated => 0,
            EventKind::FileAccessed => 1,
            EventKind::FileDeleted => 2,
            EventKind::TierNearlyFull => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::FileCreated => "file_created",
            EventKind::FileAccessed => "file_accessed",
            EventKind::FileDeleted => "file_deleted",
            EventKind::TierNearlyFull => "tier_nearly_full",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who caused a read or write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessCause {
    /// The replayed workload.
    Workload,
    /// The transfer half of a migration.
    Migration,
}

/// Payload delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum StorageEvent {
    FileCreated {
        tier: TierId,
        file: File,
    },
    FileAccessed {
        tier: TierId,
        file: File,
        is_write: bool,
        cause: AccessCause,
    },
    FileDeleted {
        tier: TierId,
        file: File,
    },
    TierNearlyFull {
        tier: TierId,
    },
}

impl StorageEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            StorageEvent::FileCreated { .. } => EventKind::FileCreated,
            StorageEvent::FileAccessed { .. } => EventKind::FileAccessed,
            StorageEvent::FileDeleted { .. } => EventKind::FileDeleted,
            StorageEvent::TierNearlyFull { .. } => EventKind::TierNearlyFull,
        }
    }

    /// The tier that acted.
    pub fn tier(&self) -> TierId {
        match self {
            StorageEvent::FileCreated { tier, .. }
            | StorageEvent::FileAccessed { tier, .. }
            | StorageEvent::FileDeleted { tier, .. }
            | StorageEvent::TierNearlyFull { tier } => *tier,
        }
    }

    /// Snapshot of the affected file, if the event concerns one.
    pub fn file(&self) -> Option<&File> {
        match self {
            StorageEvent::FileCreated { file, .. }
            | StorageEvent::FileAccessed { file, .. }
            | StorageEvent::FileDeleted { file, .. } => Some(file),
            StorageEvent::TierNearlyFull { .. } => None,
        }
    }
}

/// Handle identifying one subscriber (an installed policy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(usize);

impl SubscriberId {
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// The next occurrence of one event kind and who is waiting on it.
#[derive(Debug, PartialEq, Eq)]
pub struct PendingEvent {
    kind: EventKind,
    generation: u64,
    subscribers: Vec<SubscriberId>,
}

impl PendingEvent {
    fn new(kind: EventKind, generation: u64) -> Self {
        Self {
            kind,
            generation,
            subscribers: Vec::new(),
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// How many occurrences of this kind fired before this one.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Subscribers in subscription order.
    pub fn subscribers(&self) -> &[SubscriberId] {
        &self.subscribers
    }

    fn subscribe(&mut self, id: SubscriberId) -> bool {
        if self.subscribers.contains(&id) {
            return false;
        }
        self.subscribers.push(id);
        true
    }

    /// Consumes the event, yielding who to notify. A resolved event cannot be
    /// resolved again.
    pub fn resolve(self) -> Vec<SubscriberId> {
        self.subscribers
    }
}

/// A fired event on its way to its subscribers.
#[derive(Debug)]
pub struct Delivery {
    pub event: StorageEvent,
    pub pending: PendingEvent,
}

/// One pending-event slot per kind.
#[derive(Debug)]
pub struct EventBus {
    slots: [PendingEvent; 4],
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            slots: EventKind::ALL.map(|kind| PendingEvent::new(kind, 0)),
        }
    }

    /// Attaches `id` to the next occurrence of `kind`.
    ///
    /// Returns `false` if it was already attached; a subscriber is notified at
    /// most once per occurrence.
    pub fn subscribe(&mut self, kind: EventKind, id: SubscriberId) -> bool {
        self.slots[kind.slot()].subscribe(id)
    }

    pub fn is_subscribed(&self, kind: EventKind, id: SubscriberId) -> bool {
        self.slots[kind.slot()].subscribers.contains(&id)
    }

    pub fn pending(&self, kind: EventKind) -> &PendingEvent {
        &self.slots[kind.slot()]
    }

    /// Replaces the pending event for `kind` with a fresh one and returns the
    /// old one for resolution.
    pub fn rearm(&mut self, kind: EventKind) -> PendingEvent {
        let slot = &mut self.slots[kind.slot()];
        let next = PendingEvent::new(kind, slot.generation + 1);
        std::mem::replace(slot, next)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
