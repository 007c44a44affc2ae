//! The policy extension contract.
//!
//! A policy manages exactly one tier. It is installed once, subscribes to the
//! events it cares about, and from then on runs only when the kernel calls
//! [`Policy::on_event`] or [`Policy::on_wakeup`]. Subscriptions are one-shot:
//! a policy that wants the next occurrence of a kind must subscribe again
//! while handling the current one.
//!
//! Everything a policy may do goes through [`PolicyContext`]: look at tiers
//! and files, migrate or delete files, subscribe, and schedule its own
//! wakeups. The kernel never inspects a policy's internals.
//!
//! # Reference policies
//!
//! | Kind       | Victim order                                           |
//! |------------|--------------------------------------------------------|
//! | `lru`      | oldest last access first                               |
//! | `fifo`     | oldest creation first                                  |
//! | `random`   | seeded shuffle                                         |
//! | `lifetime` | past expected lifetime first, then least recently used |

mod lifetime;
mod order;
mod tiering;

use std::sync::Arc;

use tiersim_config::PolicyKind;

use crate::error::StorageError;
use crate::event::{EventKind, StorageEvent, SubscriberId};
use crate::file::{File, TierId};
use crate::rng::SimRng;
use crate::sim::Action;
use crate::storage::StorageManager;
use crate::tier::Tier;

pub use lifetime::{LifetimeMap, LifetimeOrder, LifetimePolicy};
pub use order::{FifoOrder, LruOrder, RandomOrder};
pub use tiering::{TieringPolicy, VictimOrder};

/// Eviction and placement logic bound to one tier.
pub trait Policy {
    /// Short identifier used in logs and errors.
    fn name(&self) -> &'static str;

    /// Called once, before the run starts. Initial subscriptions go here.
    fn install(&mut self, ctx: &mut PolicyContext<'_>);

    /// Called for every delivered event the policy was subscribed to.
    fn on_event(&mut self, event: &StorageEvent, ctx: &mut PolicyContext<'_>);

    /// Called when a wakeup scheduled through
    /// [`PolicyContext::schedule_wakeup`] comes due.
    fn on_wakeup(&mut self, token: u64, ctx: &mut PolicyContext<'_>) {
        let _ = (token, ctx);
    }
}

/// A policy's window onto the kernel while it is running.
pub struct PolicyContext<'a> {
    storage: &'a mut StorageManager,
    id: SubscriberId,
    tier: TierId,
}

impl<'a> PolicyContext<'a> {
    pub(crate) fn new(storage: &'a mut StorageManager, id: SubscriberId, tier: TierId) -> Self {
        Self { storage, id, tier }
    }

    /// This policy's subscriber handle.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn managed_tier(&self) -> TierId {
        self.tier
    }

    pub fn now_ns(&self) -> u64 {
        self.storage.now()
    }

    /// Read-only view of the whole storage hierarchy.
    pub fn storage(&self) -> &StorageManager {
        &*self.storage
    }

    pub fn tier(&self, id: TierId) -> &Tier {
        self.storage.tier(id)
    }

    pub fn default_tier(&self) -> TierId {
        self.storage.default_tier_id()
    }

    pub fn slower_tier(&self, of: TierId) -> Option<TierId> {
        self.storage.slower_tier(of)
    }

    pub fn get_file(&self, path: &str) -> Option<&File> {
        self.storage.get_file(path)
    }

    /// Subscribes to the next occurrence of `kind`.
    pub fn subscribe(&mut self, kind: EventKind) {
        self.storage.subscribe(kind, self.id);
    }

    /// Migrates `file` to `target` at the current instant.
    pub fn migrate(&mut self, file: &File, target: TierId) -> Result<u64, StorageError> {
        let now = self.storage.now();
        self.storage.migrate(file, target, now)
    }

    pub fn delete_file(&mut self, tier: TierId, path: &str) -> u64 {
        self.storage.delete_file(tier, path)
    }

    /// Asks to be woken up `delay_ns` from now with `token`.
    pub fn schedule_wakeup(&mut self, delay_ns: u64, token: u64) {
        let policy = self.id;
        self.storage
            .scheduler_mut()
            .schedule_after(delay_ns, Action::Wakeup { policy, token });
    }
}

/// Builds a reference policy.
///
/// Only [`PolicyKind::Lifetime`] receives the lifetime map; only
/// [`PolicyKind::Random`] draws from `rng`.
pub fn build_policy(kind: PolicyKind, lifetimes: &Arc<LifetimeMap>, rng: SimRng) -> Box<dyn Policy> {
    match kind {
        PolicyKind::Lru => Box::new(TieringPolicy::new(LruOrder)),
        PolicyKind::Fifo => Box::new(TieringPolicy::new(FifoOrder)),
        PolicyKind::Random => Box::new(TieringPolicy::new(RandomOrder::new(rng))),
        PolicyKind::Lifetime => Box::new(LifetimePolicy::new(Arc::clone(lifetimes))),
    }
}
