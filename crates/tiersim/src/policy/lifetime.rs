//! Lifetime-aware tiering.
//!
//! Trace sources can estimate how long each file stays useful. The lifetime
//! policy uses those estimates twice: files that outlived their expected
//! lifetime are the first victims under pressure, and every file gets a
//! wakeup at `creation + lifetime` that demotes it early if it has gone idle.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::tiering::{TieringPolicy, VictimOrder, demote};
use super::{Policy, PolicyContext};
use crate::clock::sec_to_ns;
use crate::event::{EventKind, StorageEvent};
use crate::file::File;

// ============================================================================
// Lifetime Map
// ============================================================================

/// Expected lifetime per file path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LifetimeMap {
    lifetimes_ns: HashMap<String, u64>,
}

impl LifetimeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `secs` for `path`. Negative estimates are clamped to zero and
    /// NaN is ignored.
    pub fn insert(&mut self, path: impl Into<String>, secs: f64) {
        if secs.is_nan() {
            return;
        }
        let secs = secs.clamp(0.0, u64::MAX as f64 / 1e9);
        self.lifetimes_ns.insert(path.into(), sec_to_ns(secs));
    }

    pub fn get_ns(&self, path: &str) -> Option<u64> {
        self.lifetimes_ns.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.lifetimes_ns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lifetimes_ns.is_empty()
    }
}

impl<P: Into<String>> FromIterator<(P, f64)> for LifetimeMap {
    fn from_iter<I: IntoIterator<Item = (P, f64)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (path, secs) in iter {
            map.insert(path, secs);
        }
        map
    }
}

// ============================================================================
// Victim Order
// ============================================================================

/// Files past their expected lifetime first, most overdue first, then the
/// rest least recently used first.
#[derive(Debug, Clone)]
pub struct LifetimeOrder {
    lifetimes: Arc<LifetimeMap>,
}

impl LifetimeOrder {
    pub fn new(lifetimes: Arc<LifetimeMap>) -> Self {
        Self { lifetimes }
    }

    /// How far past its expected end of life `file` is, if it is.
    pub fn overdue_ns(&self, file: &File, now_ns: u64) -> Option<u64> {
        let lifetime = self.lifetimes.get_ns(&file.path)?;
        let deadline = file.creation_time_ns.saturating_add(lifetime);
        (now_ns > deadline).then(|| now_ns - deadline)
    }
}

impl VictimOrder for LifetimeOrder {
    fn name(&self) -> &'static str {
        "lifetime"
    }

    fn rank(&mut self, candidates: &mut [File], now_ns: u64) {
        candidates.sort_by_key(|file| match self.overdue_ns(file, now_ns) {
            Some(overdue) => (0, u64::MAX - overdue),
            None => (1, file.last_access_ns),
        });
    }
}

// ============================================================================
// Policy
// ============================================================================

/// Tiering with lifetime-ordered victims and idle-file wakeups.
#[derive(Debug)]
pub struct LifetimePolicy {
    inner: TieringPolicy<LifetimeOrder>,
    lifetimes: Arc<LifetimeMap>,
    /// Outstanding wakeups by token.
    wakeups: HashMap<u64, String>,
    next_token: u64,
}

impl LifetimePolicy {
    pub fn new(lifetimes: Arc<LifetimeMap>) -> Self {
        Self {
            inner: TieringPolicy::new(LifetimeOrder::new(Arc::clone(&lifetimes))),
            lifetimes,
            wakeups: HashMap::new(),
            next_token: 0,
        }
    }

    fn schedule(&mut self, ctx: &mut PolicyContext<'_>, path: &str, at_ns: u64) {
        let token = self.next_token;
        self.next_token += 1;
        self.wakeups.insert(token, path.to_owned());
        ctx.schedule_wakeup(at_ns.saturating_sub(ctx.now_ns()), token);
    }
}

impl Policy for LifetimePolicy {
    fn name(&self) -> &'static str {
        "lifetime"
    }

    fn install(&mut self, ctx: &mut PolicyContext<'_>) {
        self.inner.install(ctx);
        ctx.subscribe(EventKind::FileCreated);
    }

    fn on_event(&mut self, event: &StorageEvent, ctx: &mut PolicyContext<'_>) {
        if let StorageEvent::FileCreated { tier, file } = event {
            ctx.subscribe(EventKind::FileCreated);
            if *tier == ctx.managed_tier() {
                if let Some(lifetime) = self.lifetimes.get_ns(&file.path) {
                    let deadline = file.creation_time_ns.saturating_add(lifetime);
                    self.schedule(ctx, &file.path, deadline);
                }
            }
            self.inner.relieve(ctx);
            return;
        }
        self.inner.on_event(event, ctx);
    }

    fn on_wakeup(&mut self, token: u64, ctx: &mut PolicyContext<'_>) {
        let Some(path) = self.wakeups.remove(&token) else {
            return;
        };
        let managed = ctx.managed_tier();
        let Some(file) = ctx.get_file(&path).filter(|f| f.tier == managed).cloned() else {
            return;
        };
        let Some(lifetime) = self.lifetimes.get_ns(&path) else {
            return;
        };

        let idle_until = file.last_access_ns.saturating_add(lifetime);
        if idle_until > ctx.now_ns() {
            self.schedule(ctx, &path, idle_until);
            return;
        }

        // the last tier keeps idle files; only pressure deletes there
        if let Some(target) = ctx.slower_tier(managed) {
            debug!(path = %path, idle_ns = file.idle_ns(ctx.now_ns()), "file outlived its lifetime");
            demote(ctx, &file, Some(target));
        }
    }
}
