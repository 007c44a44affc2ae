//! Trace replay boundary.
//!
//! Parsing trace files is left to the caller. This module takes already
//! decoded [`TraceRecord`]s, schedules each at its timestamp, and dispatches
//! it to the tier that currently holds the path:
//!
//! ```text
//! create       -> tier holding the path, else the default tier
//! read/write   -> tier holding the path, skipped if none
//! delete       -> tier holding the path, skipped if none
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::StorageError;
use crate::sim::Simulation;

/// File operation recorded in a workload trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceOp {
    Create,
    Read,
    Write,
    Delete,
}

impl fmt::Display for TraceOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TraceOp::Create => "create",
            TraceOp::Read => "read",
            TraceOp::Write => "write",
            TraceOp::Delete => "delete",
        })
    }
}

/// One decoded trace line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceRecord {
    pub timestamp_ns: u64,
    pub op: TraceOp,
    pub path: String,
    /// Only meaningful for creates.
    #[serde(default)]
    pub size: u64,
}

impl TraceRecord {
    pub fn new(timestamp_ns: u64, op: TraceOp, path: impl Into<String>, size: u64) -> Self {
        Self {
            timestamp_ns,
            op,
            path: path.into(),
            size,
        }
    }
}

impl Simulation {
    /// Schedules every record at its timestamp and returns how many were
    /// queued.
    ///
    /// Records stamped before the current instant run now, keeping their
    /// original timestamp for file metadata.
    pub fn schedule_trace(&mut self, records: impl IntoIterator<Item = TraceRecord>) -> usize {
        let mut queued = 0;
        for record in records {
            let at = record.timestamp_ns.max(self.now());
            self.schedule_at(at, move |sim| {
                if let Err(error) = sim.apply_record(&record) {
                    warn!(%error, op = %record.op, path = %record.path, "trace record rejected");
                }
            });
            queued += 1;
        }
        queued
    }

    /// Applies one record immediately and returns the operation's delay.
    pub fn apply_record(&mut self, record: &TraceRecord) -> Result<u64, StorageError> {
        let storage = self.storage_mut();
        let current = storage.get_file(&record.path).map(|file| file.tier);
        let ts = record.timestamp_ns;

        let delay = match (record.op, current) {
            (TraceOp::Create, current) => {
                let tier = current.unwrap_or_else(|| storage.default_tier_id());
                storage.create_file(tier, ts, &record.path, record.size)?
            }
            (TraceOp::Read, Some(tier)) => storage.read_file(tier, ts, &record.path),
            (TraceOp::Write, Some(tier)) => storage.write_file(tier, ts, &record.path),
            (TraceOp::Delete, Some(tier)) => storage.delete_file(tier, &record.path),
            (_, None) => 0,
        };
        Ok(delay)
    }
}
