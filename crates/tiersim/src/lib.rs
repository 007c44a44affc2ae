//! # tiersim: Discrete-Event Simulation of Multi-Tier Storage
//!
//! This crate replays file-access workloads against a simulated storage
//! hierarchy (e.g. SSD, HDD, tape) to evaluate placement and eviction
//! policies in virtual time.
//!
//! ## Guarantees
//!
//! - **Determinism**: same configuration, seed and trace give the same run
//! - **Single residency**: a path lives on at most one tier at any instant
//! - **Exact accounting**: a tier's `used_size` is always the sum of its
//!   resident file sizes
//! - **Deferred notification**: events are never delivered synchronously;
//!   subscribers run in their own scheduled step
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                           Simulation                             │
//! │  ┌────────────────────────────────────────────┐  ┌────────────┐  │
//! │  │               StorageManager               │  │  Policies  │  │
//! │  │  ┌──────────┐ ┌──────────┐ ┌────────────┐  │  │  (one per  │  │
//! │  │  │  Tiers   │ │ EventBus │ │ Scheduler  │◄─┼──┤   tier)    │  │
//! │  │  │ (files)  │ │ (4 slots)│ │ (virtual t)│  │  │            │  │
//! │  │  └──────────┘ └──────────┘ └────────────┘  │  └────────────┘  │
//! │  └────────────────────────────────────────────┘        ▲         │
//! │          ▲ create/read/write/delete                    │ events  │
//! │    trace replay ──────────────────────────── Deliver ──┘         │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use tiersim::{LifetimeMap, PolicyKind, Simulation, TraceOp, TraceRecord};
//! use tiersim_config::TiersimConfig;
//!
//! let config = TiersimConfig::load()?;
//! let mut sim = Simulation::from_config(&config, PolicyKind::Lru, LifetimeMap::new())?;
//! sim.schedule_trace([
//!     TraceRecord::new(0, TraceOp::Create, "/data/a", 4096),
//!     TraceRecord::new(1_000, TraceOp::Read, "/data/a", 0),
//! ]);
//! let summary = sim.run();
//! ```
//!
//! ## Key Concepts
//!
//! - **`Scheduler`**: virtual-time queue ordered by `(time, priority, sequence)`
//! - **`Tier`**: capacity-bounded file container with a latency + throughput cost
//! - **`StorageManager`**: owns the tiers, the namespace and the event bus
//! - **`Policy`**: eviction and placement logic reacting to storage events

#![cfg_attr(test, allow(clippy::float_cmp))] // Tests compare exact cost-model results
#![allow(clippy::cast_lossless)] // Byte counts are widened to f64 for the cost model

mod clock;
mod error;
mod event;
mod file;
pub mod policy;
mod rng;
mod scheduler;
mod sim;
mod storage;
mod tier;
mod trace;

pub use clock::{NS_PER_SEC, SimClock, ns_to_sec, sec_to_ns};
pub use error::StorageError;
pub use event::{
    AccessCause, Delivery, EventBus, EventKind, PendingEvent, StorageEvent, SubscriberId,
};
pub use file::{File, TierId};
pub use policy::{LifetimeMap, Policy, PolicyContext, build_policy};
pub use rng::SimRng;
pub use scheduler::{EventId, Priority, Scheduled, Scheduler};
pub use sim::{Action, Callback, RunLimits, SimSummary, Simulation, TierSummary};
pub use storage::{KERNEL_EVENT_PRIORITY, StorageManager, TierMut};
pub use tier::{DEFAULT_TARGET_OCCUPATION, Tier, TierSpec, TierStats};
pub use tiersim_config::PolicyKind;
pub use trace::{TraceOp, TraceRecord};
