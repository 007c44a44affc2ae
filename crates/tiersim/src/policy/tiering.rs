//! Demote-on-pressure, promote-on-read tiering.

use tracing::debug;

use super::{Policy, PolicyContext};
use crate::event::{AccessCause, EventKind, StorageEvent};
use crate::file::{File, TierId};

/// Decides which resident files leave a tier first.
pub trait VictimOrder {
    fn name(&self) -> &'static str;

    /// Reorders `candidates` so the first victim comes first. Candidates
    /// arrive in path order.
    fn rank(&mut self, candidates: &mut [File], now_ns: u64);
}

/// Policy that keeps its tier below the target occupation.
///
/// When the managed tier reports it is nearly full, files are demoted to the
/// next slower tier in [`VictimOrder`] until the alert condition clears. On
/// the last tier there is nowhere to demote to, so victims are deleted.
///
/// The policy managing the default tier also promotes files read by the
/// workload from any slower tier, provided the file would fit under the
/// tier's alert threshold on its own.
#[derive(Debug)]
pub struct TieringPolicy<O> {
    order: O,
}

impl<O: VictimOrder> TieringPolicy<O> {
    pub fn new(order: O) -> Self {
        Self { order }
    }

    /// Demotes victims until the managed tier is no longer nearly full.
    pub fn relieve(&mut self, ctx: &mut PolicyContext<'_>) {
        let managed = ctx.managed_tier();
        if !ctx.tier(managed).is_nearly_full() {
            return;
        }

        let mut candidates: Vec<File> = ctx.tier(managed).files().cloned().collect();
        self.order.rank(&mut candidates, ctx.now_ns());
        let target = ctx.slower_tier(managed);

        for victim in candidates {
            if !ctx.tier(managed).is_nearly_full() {
                break;
            }
            demote(ctx, &victim, target);
        }
    }

    fn maybe_promote(&mut self, ctx: &mut PolicyContext<'_>, accessed_on: TierId, path: &str) {
        let managed = ctx.managed_tier();
        if managed != ctx.default_tier() || !managed.is_faster_than(accessed_on) {
            return;
        }

        // the event is a snapshot; the file may have moved since it fired
        let Some(file) = ctx.get_file(path).filter(|f| f.tier == accessed_on).cloned() else {
            return;
        };

        let threshold = ctx.tier(managed).nearly_full_threshold();
        if file.size as f64 >= threshold {
            debug!(
                policy = self.order.name(),
                path = %file.path,
                size = file.size,
                threshold,
                "file too large to promote"
            );
            return;
        }

        match ctx.migrate(&file, managed) {
            Ok(delay_ns) => debug!(
                policy = self.order.name(),
                path = %file.path,
                from = %accessed_on,
                delay_ns,
                "promoted file"
            ),
            Err(error) => debug!(policy = self.order.name(), %error, "promotion skipped"),
        }
    }
}

/// Moves `victim` one tier down, or deletes it when there is no lower tier.
pub(crate) fn demote(ctx: &mut PolicyContext<'_>, victim: &File, target: Option<TierId>) {
    match target {
        Some(target) => match ctx.migrate(victim, target) {
            Ok(delay_ns) => debug!(
                path = %victim.path,
                from = %victim.tier,
                to = %target,
                delay_ns,
                "demoted file"
            ),
            Err(error) => debug!(%error, "demotion skipped"),
        },
        None => {
            ctx.delete_file(victim.tier, &victim.path);
            debug!(path = %victim.path, tier = %victim.tier, "evicted file from last tier");
        }
    }
}

impl<O: VictimOrder> Policy for TieringPolicy<O> {
    fn name(&self) -> &'static str {
        self.order.name()
    }

    fn install(&mut self, ctx: &mut PolicyContext<'_>) {
        ctx.subscribe(EventKind::TierNearlyFull);
        ctx.subscribe(EventKind::FileAccessed);
    }

    fn on_event(&mut self, event: &StorageEvent, ctx: &mut PolicyContext<'_>) {
        ctx.subscribe(event.kind());

        if let StorageEvent::FileAccessed {
            tier,
            file,
            is_write: false,
            cause: AccessCause::Workload,
        } = event
        {
            self.maybe_promote(ctx, *tier, &file.path);
        }

        // An alert fired while this policy was between a delivery and its
        // re-subscription never reaches it, so pressure is checked on every
        // delivery rather than only on `tier_nearly_full`.
        self.relieve(ctx);
    }
}
