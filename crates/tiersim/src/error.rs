//! Error types for the storage kernel.
//!
//! Missing paths are not errors: reads, writes and deletes of an absent path
//! are silent zero-cost no-ops. What remains here are setup mistakes and
//! requests that would break the single-residency namespace.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StorageError {
    /// A create targeted one tier while the path lives on another.
    #[error("`{path}` already lives on tier {tier}")]
    AlreadyResident { path: String, tier: String },

    /// A migration named a source tier that no longer holds the file.
    #[error("`{path}` is not resident on tier {tier}")]
    NotResident { path: String, tier: String },

    #[error("tier {tier} is already managed by the {policy} policy")]
    TierBusy { tier: String, policy: &'static str },

    #[error("a storage manager needs at least one tier")]
    NoTiers,

    #[error("default tier index {index} is out of range for {tiers} tiers")]
    DefaultTierOutOfRange { index: usize, tiers: usize },

    #[error("invalid tier `{name}`: {reason}")]
    InvalidTier { name: String, reason: String },
}
