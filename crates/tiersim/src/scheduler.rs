//! Virtual-time event queue.
//!
//! The scheduler holds actions keyed by the instant they become due and runs
//! them strictly in order. Nothing executes concurrently: code that wants to
//! "wait" schedules a continuation and returns.
//!
//! # Ordering
//!
//! Entries are ordered by `(time_ns, priority, sequence)`:
//!
//! ```text
//! time_ns   - when the action is due
//! priority  - lower runs first among actions due at the same instant
//! sequence  - scheduling order, the FIFO tie-break
//! ```
//!
//! Priority stands in for a sub-nanosecond offset (`priority * epsilon`) added
//! to the due time. Keeping it as a separate key gives the same order as the
//! offset would while staying exact at any timestamp.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::clock::SimClock;

/// Ordering key among actions due at the same instant. Lower runs first.
pub type Priority = u32;

/// Identifier of a scheduled action, unique within one scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId(u64);

/// An action popped from the queue, with the key it was scheduled under.
#[derive(Debug)]
pub struct Scheduled<A> {
    pub id: EventId,
    pub time_ns: u64,
    pub priority: Priority,
    pub action: A,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Key {
    time_ns: u64,
    priority: Priority,
    sequence: u64,
}

struct Entry<A> {
    key: Key,
    action: A,
}

impl<A> PartialEq for Entry<A> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<A> Eq for Entry<A> {}

impl<A> PartialOrd for Entry<A> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<A> Ord for Entry<A> {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse so the earliest key surfaces first.
        other.key.cmp(&self.key)
    }
}

/// Discrete-event scheduler over action payloads of type `A`.
pub struct Scheduler<A> {
    clock: SimClock,
    queue: BinaryHeap<Entry<A>>,
    next_sequence: u64,
    processed: u64,
}

impl<A> Scheduler<A> {
    pub fn new() -> Self {
        Self {
            clock: SimClock::new(),
            queue: BinaryHeap::new(),
            next_sequence: 0,
            processed: 0,
        }
    }

    /// Current simulated time in nanoseconds.
    #[inline]
    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    /// Schedules `action` at an absolute instant with priority 0.
    ///
    /// # Panics
    ///
    /// Panics if `time_ns` lies before the current time.
    pub fn schedule_at(&mut self, time_ns: u64, action: A) -> EventId {
        self.schedule_at_with_priority(time_ns, 0, action)
    }

    /// Schedules `action` at an absolute instant.
    ///
    /// # Panics
    ///
    /// Panics if `time_ns` lies before the current time.
    pub fn schedule_at_with_priority(
        &mut self,
        time_ns: u64,
        priority: Priority,
        action: A,
    ) -> EventId {
        assert!(
            time_ns >= self.clock.now(),
            "cannot schedule in the past: now={}, requested={}",
            self.clock.now(),
            time_ns
        );

        let sequence = self.next_sequence;
        self.next_sequence += 1;

        self.queue.push(Entry {
            key: Key {
                time_ns,
                priority,
                sequence,
            },
            action,
        });

        EventId(sequence)
    }

    /// Schedules `action` at `now + delay_ns` with priority 0.
    pub fn schedule_after(&mut self, delay_ns: u64, action: A) -> EventId {
        self.schedule_after_with_priority(delay_ns, 0, action)
    }

    /// Schedules `action` at `now + delay_ns`.
    pub fn schedule_after_with_priority(
        &mut self,
        delay_ns: u64,
        priority: Priority,
        action: A,
    ) -> EventId {
        let time_ns = self
            .clock
            .now()
            .checked_add(delay_ns)
            .expect("simulated clock overflow");
        self.schedule_at_with_priority(time_ns, priority, action)
    }

    /// Removes the earliest action and advances the clock to its due time.
    ///
    /// When the queue is empty the clock stays at the last instant reached.
    pub fn pop(&mut self) -> Option<Scheduled<A>> {
        let entry = self.queue.pop()?;
        self.clock.advance_to(entry.key.time_ns);
        self.processed += 1;

        Some(Scheduled {
            id: EventId(entry.key.sequence),
            time_ns: entry.key.time_ns,
            priority: entry.key.priority,
            action: entry.action,
        })
    }

    /// Due time of the earliest pending action.
    pub fn next_time(&self) -> Option<u64> {
        self.queue.peek().map(|entry| entry.key.time_ns)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of actions popped so far.
    pub fn events_processed(&self) -> u64 {
        self.processed
    }
}

impl<A> Default for Scheduler<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> std::fmt::Debug for Scheduler<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("now_ns", &self.clock.now())
            .field("pending", &self.queue.len())
            .field("processed", &self.processed)
            .finish()
    }
}
