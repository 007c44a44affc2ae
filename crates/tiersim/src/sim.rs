//! The simulation driver.
//!
//! [`Simulation`] owns the storage hierarchy and the installed policies and
//! runs the scheduler loop. Every queued [`Action`] is one of:
//!
//! ```text
//! Callback  - arbitrary continuation, e.g. one replayed trace record
//! Deliver   - a fired storage event on its way to its subscribers
//! Wakeup    - a policy asked to be called back at this instant
//! ```

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tiersim_config::{PolicyKind, TiersimConfig};
use tracing::{debug, info, trace};

use crate::error::StorageError;
use crate::event::{Delivery, SubscriberId};
use crate::file::TierId;
use crate::policy::{LifetimeMap, Policy, PolicyContext, build_policy};
use crate::rng::SimRng;
use crate::scheduler::EventId;
use crate::storage::StorageManager;
use crate::tier::TierStats;

/// Continuation run with exclusive access to the simulation.
pub type Callback = Box<dyn FnOnce(&mut Simulation)>;

/// Work item held by the scheduler.
pub enum Action {
    Callback(Callback),
    Deliver(Delivery),
    Wakeup { policy: SubscriberId, token: u64 },
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Callback(_) => f.write_str("Callback"),
            Action::Deliver(delivery) => f.debug_tuple("Deliver").field(delivery).finish(),
            Action::Wakeup { policy, token } => f
                .debug_struct("Wakeup")
                .field("policy", policy)
                .field("token", token)
                .finish(),
        }
    }
}

// ============================================================================
// Run Limits
// ============================================================================

/// Optional bounds on a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunLimits {
    /// Stop after this many actions.
    pub max_events: Option<u64>,
    /// Do not run actions due after this instant.
    pub max_time_ns: Option<u64>,
}

impl RunLimits {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn with_max_events(mut self, max_events: u64) -> Self {
        self.max_events = Some(max_events);
        self
    }

    pub fn with_max_time_ns(mut self, max_time_ns: u64) -> Self {
        self.max_time_ns = Some(max_time_ns);
        self
    }

    pub fn from_config(config: &TiersimConfig) -> Self {
        Self {
            max_events: config.simulation.max_events,
            max_time_ns: config.max_time_ns(),
        }
    }
}

// ============================================================================
// Simulation
// ============================================================================

struct InstalledPolicy {
    tier: TierId,
    policy: Box<dyn Policy>,
}

/// A storage hierarchy, its policies, and the loop that drives them.
pub struct Simulation {
    storage: StorageManager,
    policies: Vec<InstalledPolicy>,
    limits: RunLimits,
    seed: u64,
}

impl Simulation {
    /// A simulation over `storage` with no policies and no limits.
    pub fn new(storage: StorageManager) -> Self {
        Self {
            storage,
            policies: Vec::new(),
            limits: RunLimits::unlimited(),
            seed: 0,
        }
    }

    /// Builds the tier topology from `config` and installs a policy on
    /// every tier whose assignment resolves to one.
    ///
    /// `selected` stands in for tiers configured with `policy = "selected"`.
    /// Each policy gets its own random stream forked from the configured
    /// seed.
    pub fn from_config(
        config: &TiersimConfig,
        selected: PolicyKind,
        lifetimes: LifetimeMap,
    ) -> Result<Self, StorageError> {
        let storage = StorageManager::from_config(config)?;
        let seed = config.simulation.seed;
        let mut sim = Self::new(storage)
            .with_seed(seed)
            .with_limits(RunLimits::from_config(config));

        let lifetimes = Arc::new(lifetimes);
        let mut rng = SimRng::new(seed);
        for (index, tier) in config.tiers.iter().enumerate() {
            if let Some(kind) = tier.policy.resolve(selected) {
                let policy = build_policy(kind, &lifetimes, rng.fork());
                sim.install_policy(TierId::new(index), policy)?;
            }
        }
        Ok(sim)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_limits(mut self, limits: RunLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn limits(&self) -> RunLimits {
        self.limits
    }

    pub fn storage(&self) -> &StorageManager {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut StorageManager {
        &mut self.storage
    }

    #[inline]
    pub fn now(&self) -> u64 {
        self.storage.now()
    }

    pub fn events_processed(&self) -> u64 {
        self.storage.scheduler().events_processed()
    }

    /// Binds `policy` to `tier` and lets it subscribe.
    ///
    /// # Errors
    ///
    /// [`StorageError::TierBusy`] if the tier already has a policy.
    pub fn install_policy(
        &mut self,
        tier: TierId,
        mut policy: Box<dyn Policy>,
    ) -> Result<SubscriberId, StorageError> {
        if let Some(existing) = self.policies.iter().find(|installed| installed.tier == tier) {
            return Err(StorageError::TierBusy {
                tier: self.storage.tier(tier).name().to_owned(),
                policy: existing.policy.name(),
            });
        }

        let id = SubscriberId::new(self.policies.len());
        let mut ctx = PolicyContext::new(&mut self.storage, id, tier);
        policy.install(&mut ctx);

        debug!(
            policy = policy.name(),
            tier = self.storage.tier(tier).name(),
            "installed policy"
        );
        self.policies.push(InstalledPolicy { tier, policy });
        Ok(id)
    }

    /// Name of the policy managing `tier`, if any.
    pub fn policy_on(&self, tier: TierId) -> Option<&'static str> {
        self.policies
            .iter()
            .find(|installed| installed.tier == tier)
            .map(|installed| installed.policy.name())
    }

    /// Schedules `callback` at an absolute instant.
    ///
    /// # Panics
    ///
    /// Panics if `time_ns` lies in the past.
    pub fn schedule_at(
        &mut self,
        time_ns: u64,
        callback: impl FnOnce(&mut Simulation) + 'static,
    ) -> EventId {
        self.storage
            .scheduler_mut()
            .schedule_at(time_ns, Action::Callback(Box::new(callback)))
    }

    pub fn schedule_after(
        &mut self,
        delay_ns: u64,
        callback: impl FnOnce(&mut Simulation) + 'static,
    ) -> EventId {
        self.storage
            .scheduler_mut()
            .schedule_after(delay_ns, Action::Callback(Box::new(callback)))
    }

    /// Runs the next action.
    ///
    /// Returns `false` when the queue is empty or a run limit is reached.
    pub fn step(&mut self) -> bool {
        let processed = self.events_processed();
        if self.limits.max_events.is_some_and(|max| processed >= max) {
            return false;
        }

        let Some(next_ns) = self.storage.scheduler().next_time() else {
            return false;
        };
        if self.limits.max_time_ns.is_some_and(|max| next_ns > max) {
            return false;
        }

        let Some(scheduled) = self.storage.scheduler_mut().pop() else {
            return false;
        };
        match scheduled.action {
            Action::Callback(callback) => callback(self),
            Action::Deliver(delivery) => self.deliver(delivery),
            Action::Wakeup { policy, token } => self.wake(policy, token),
        }
        true
    }

    /// Runs until the queue drains or a limit is reached.
    pub fn run(&mut self) -> SimSummary {
        info!(
            seed = self.seed,
            tiers = self.storage.tiers().len(),
            policies = self.policies.len(),
            queued = self.storage.scheduler().len(),
            "simulation started"
        );

        while self.step() {}

        let summary = self.summary();
        info!(
            events_processed = summary.events_processed,
            final_time_ns = summary.final_time_ns,
            pending = self.storage.scheduler().len(),
            "simulation finished"
        );
        summary
    }

    /// Runs every action due at or before `time_ns`.
    pub fn run_until(&mut self, time_ns: u64) {
        while self
            .storage
            .scheduler()
            .next_time()
            .is_some_and(|next| next <= time_ns)
        {
            if !self.step() {
                break;
            }
        }
    }

    pub fn summary(&self) -> SimSummary {
        let tiers = self
            .storage
            .tiers()
            .iter()
            .map(|tier| TierSummary {
                name: tier.name().to_owned(),
                policy: self.policy_on(tier.id()),
                max_size: tier.max_size(),
                used_size: tier.used_size(),
                file_count: tier.file_count(),
                io_count: tier.stats().io_count(),
                migration_io_count: tier.stats().migration_io_count(),
                stats: tier.stats().clone(),
            })
            .collect();

        SimSummary {
            seed: self.seed,
            events_processed: self.events_processed(),
            final_time_ns: self.now(),
            tiers,
        }
    }

    fn deliver(&mut self, delivery: Delivery) {
        let Delivery { event, pending } = delivery;
        let generation = pending.generation();
        let subscribers = pending.resolve();

        trace!(
            kind = %event.kind(),
            tier = %event.tier(),
            generation,
            subscribers = subscribers.len(),
            "delivering event"
        );

        for id in subscribers {
            let Some(installed) = self.policies.get_mut(id.index()) else {
                continue;
            };
            let mut ctx = PolicyContext::new(&mut self.storage, id, installed.tier);
            installed.policy.on_event(&event, &mut ctx);
        }
    }

    fn wake(&mut self, id: SubscriberId, token: u64) {
        let Some(installed) = self.policies.get_mut(id.index()) else {
            return;
        };
        trace!(policy = installed.policy.name(), token, "policy wakeup");
        let mut ctx = PolicyContext::new(&mut self.storage, id, installed.tier);
        installed.policy.on_wakeup(token, &mut ctx);
    }
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("storage", &self.storage)
            .field("policies", &self.policies.len())
            .field("limits", &self.limits)
            .field("seed", &self.seed)
            .finish()
    }
}

// ============================================================================
// Simulation Summary
// ============================================================================

/// Outcome of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimSummary {
    pub seed: u64,
    pub events_processed: u64,
    pub final_time_ns: u64,
    /// Fastest first.
    pub tiers: Vec<TierSummary>,
}

impl SimSummary {
    pub fn tier(&self, name: &str) -> Option<&TierSummary> {
        self.tiers.iter().find(|tier| tier.name == name)
    }
}

/// End-of-run state and counters for one tier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierSummary {
    pub name: String,
    pub policy: Option<&'static str>,
    pub max_size: u64,
    pub used_size: u64,
    pub file_count: usize,
    pub io_count: u64,
    pub migration_io_count: u64,
    pub stats: TierStats,
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::event::{EventKind, StorageEvent};
    use crate::tier::TierSpec;

    fn storage() -> StorageManager {
        StorageManager::new(
            vec![
                TierSpec::new("SSD", 100, 1e-4, 2e9),
                TierSpec::new("HDD", 1_000, 1e-2, 2.5e8),
            ],
            0,
        )
        .unwrap()
    }

    /// Records every delivery and re-subscribes.
    struct Recorder {
        seen: Rc<RefCell<Vec<(u64, EventKind)>>>,
        resubscribe: bool,
    }

    impl Policy for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        fn install(&mut self, ctx: &mut PolicyContext<'_>) {
            for kind in EventKind::ALL {
                ctx.subscribe(kind);
            }
        }

        fn on_event(&mut self, event: &StorageEvent, ctx: &mut PolicyContext<'_>) {
            self.seen.borrow_mut().push((ctx.now_ns(), event.kind()));
            if self.resubscribe {
                ctx.subscribe(event.kind());
            }
        }

        fn on_wakeup(&mut self, token: u64, ctx: &mut PolicyContext<'_>) {
            self.seen.borrow_mut().push((ctx.now_ns() + token, EventKind::FileDeleted));
        }
    }

    fn recorder(resubscribe: bool) -> (Box<Recorder>, Rc<RefCell<Vec<(u64, EventKind)>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let policy = Box::new(Recorder {
            seen: Rc::clone(&seen),
            resubscribe,
        });
        (policy, seen)
    }

    #[test]
    fn callbacks_run_in_time_order() {
        let mut sim = Simulation::new(storage());
        let order = Rc::new(RefCell::new(Vec::new()));

        for (time, label) in [(30, "c"), (10, "a"), (20, "b")] {
            let order = Rc::clone(&order);
            sim.schedule_at(time, move |sim| order.borrow_mut().push((sim.now(), label)));
        }
        let summary = sim.run();

        assert_eq!(*order.borrow(), [(10, "a"), (20, "b"), (30, "c")]);
        assert_eq!(summary.events_processed, 3);
        assert_eq!(summary.final_time_ns, 30);
    }

    #[test]
    fn second_policy_on_a_tier_is_rejected() {
        let mut sim = Simulation::new(storage());
        let ssd = sim.storage().default_tier_id();
        let (first, _) = recorder(true);
        let (second, _) = recorder(true);

        sim.install_policy(ssd, first).unwrap();
        let err = sim.install_policy(ssd, second).unwrap_err();

        assert_eq!(
            err,
            StorageError::TierBusy {
                tier: "SSD".into(),
                policy: "recorder",
            }
        );
        assert_eq!(sim.policy_on(ssd), Some("recorder"));
        assert_eq!(sim.policy_on(TierId::new(1)), None);
    }

    #[test]
    fn events_are_delivered_after_the_firing_callback() {
        let mut sim = Simulation::new(storage());
        let ssd = sim.storage().default_tier_id();
        let (policy, seen) = recorder(true);
        sim.install_policy(ssd, policy).unwrap();

        let seen_in_callback = Rc::clone(&seen);
        sim.schedule_at(5, move |sim| {
            sim.storage_mut().create_file(ssd, 5, "/a", 10).unwrap();
            assert!(seen_in_callback.borrow().is_empty());
        });
        sim.run();

        assert_eq!(*seen.borrow(), [(5, EventKind::FileCreated)]);
    }

    #[test]
    fn one_shot_subscription_without_rearm_sees_only_the_first() {
        let mut sim = Simulation::new(storage());
        let ssd = sim.storage().default_tier_id();
        let (policy, seen) = recorder(false);
        sim.install_policy(ssd, policy).unwrap();

        for (time, path) in [(1, "/a"), (2, "/b")] {
            sim.schedule_at(time, move |sim| {
                sim.storage_mut().create_file(ssd, time, path, 1).unwrap();
            });
        }
        sim.run();

        assert_eq!(*seen.borrow(), [(1, EventKind::FileCreated)]);
    }

    #[test]
    fn rearmed_subscription_sees_every_occurrence_once() {
        let mut sim = Simulation::new(storage());
        let ssd = sim.storage().default_tier_id();
        let (policy, seen) = recorder(true);
        sim.install_policy(ssd, policy).unwrap();

        for (time, path) in [(1, "/a"), (2, "/b"), (3, "/c")] {
            sim.schedule_at(time, move |sim| {
                sim.storage_mut().create_file(ssd, time, path, 1).unwrap();
            });
        }
        sim.run();

        assert_eq!(
            *seen.borrow(),
            [
                (1, EventKind::FileCreated),
                (2, EventKind::FileCreated),
                (3, EventKind::FileCreated),
            ]
        );
    }

    #[test]
    fn wakeups_reach_the_policy() {
        let mut sim = Simulation::new(storage());
        let ssd = sim.storage().default_tier_id();
        let (policy, seen) = recorder(true);
        let id = sim.install_policy(ssd, policy).unwrap();

        sim.storage_mut()
            .scheduler_mut()
            .schedule_at(40, Action::Wakeup { policy: id, token: 2 });
        sim.run();

        assert_eq!(*seen.borrow(), [(42, EventKind::FileDeleted)]);
    }

    #[test]
    fn limits_stop_the_run() {
        let mut sim = Simulation::new(storage()).with_limits(RunLimits::unlimited().with_max_events(2));
        for time in [1, 2, 3] {
            sim.schedule_at(time, |_| {});
        }
        assert_eq!(sim.run().events_processed, 2);
        assert_eq!(sim.now(), 2);

        let mut sim = Simulation::new(storage()).with_limits(RunLimits::unlimited().with_max_time_ns(2));
        for time in [1, 2, 3] {
            sim.schedule_at(time, |_| {});
        }
        let summary = sim.run();
        assert_eq!(summary.events_processed, 2);
        assert_eq!(sim.storage().scheduler().len(), 1);
    }

    #[test]
    fn run_until_stops_at_the_boundary() {
        let mut sim = Simulation::new(storage());
        for time in [10, 20, 30] {
            sim.schedule_at(time, |_| {});
        }

        sim.run_until(20);

        assert_eq!(sim.now(), 20);
        assert_eq!(sim.events_processed(), 2);
    }

    #[test]
    fn default_config_installs_selected_policy_on_two_tiers() {
        let config = TiersimConfig::default();
        let sim = Simulation::from_config(&config, PolicyKind::Fifo, LifetimeMap::new()).unwrap();

        let policies: Vec<_> = sim.summary().tiers.iter().map(|tier| tier.policy).collect();
        assert_eq!(policies, [Some("fifo"), Some("fifo"), None]);
        assert_eq!(sim.seed(), config.simulation.seed);
    }
}
