//! Configuration management for tiersim
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. Environment variables (TIERSIM_* prefix, `__` between nested keys)
//! 2. tiersim.local.toml (gitignored, local overrides)
//! 3. tiersim.toml (git-tracked, project config)
//! 4. ~/.config/tiersim/config.toml (user defaults)
//! 5. Built-in defaults (lowest precedence)
//!
//! The built-in topology is the three-tier SSD / HDD / tape hierarchy the
//! policy comparisons run against.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

mod error;
mod loader;
mod paths;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use paths::Paths;

/// One gigabyte, as the topology figures are expressed.
pub const GB: u64 = 1_000_000_000;

/// Main tiersim configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TiersimConfig {
    pub simulation: SimulationConfig,
    pub tiers: Vec<TierConfig>,
}

impl Default for TiersimConfig {
    fn default() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            tiers: vec![
                TierConfig::new("SSD", 31_250_000, 100e-6, 2e9, TierPolicy::Selected),
                TierConfig::new("HDD", 8 * GB, 10e-3, 250e6, TierPolicy::Selected),
                TierConfig::new("Tapes", 50 * GB, 20.0, 315e6, TierPolicy::None),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seed for every deterministic random stream of a run.
    pub seed: u64,
    /// Tier receiving newly created files.
    pub default_tier_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_events: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_time_secs: Option<f64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            default_tier_index: 0,
            max_events: None,
            max_time_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TierConfig {
    pub name: String,
    /// Capacity in bytes.
    pub max_size: u64,
    /// Fixed per-operation overhead in seconds.
    pub latency_secs: f64,
    /// Bytes per second.
    pub throughput: f64,
    /// Fraction of `max_size` at which the tier reports itself nearly full.
    pub target_occupation: f64,
    pub policy: TierPolicy,
}

impl TierConfig {
    pub fn new(
        name: impl Into<String>,
        max_size: u64,
        latency_secs: f64,
        throughput: f64,
        policy: TierPolicy,
    ) -> Self {
        Self {
            name: name.into(),
            max_size,
            latency_secs,
            throughput,
            policy,
            ..Self::default()
        }
    }
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            name: "tier".to_string(),
            max_size: GB,
            latency_secs: 0.0,
            throughput: 1e9,
            target_occupation: 0.9,
            policy: TierPolicy::None,
        }
    }
}

/// Which policy, if any, manages a tier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TierPolicy {
    /// Whatever policy the run was started with.
    Selected,
    /// Passthrough tier, nothing is evicted automatically.
    None,
    Lru,
    Fifo,
    Random,
    Lifetime,
}

impl TierPolicy {
    /// Resolves the assignment against the policy selected for this run.
    pub fn resolve(self, selected: PolicyKind) -> Option<PolicyKind> {
        match self {
            TierPolicy::Selected => Some(selected),
            TierPolicy::None => None,
            TierPolicy::Lru => Some(PolicyKind::Lru),
            TierPolicy::Fifo => Some(PolicyKind::Fifo),
            TierPolicy::Random => Some(PolicyKind::Random),
            TierPolicy::Lifetime => Some(PolicyKind::Lifetime),
        }
    }
}

/// Eviction / placement algorithms a tier can be managed by.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyKind {
    Lru,
    Fifo,
    Random,
    Lifetime,
}

impl PolicyKind {
    pub const ALL: [PolicyKind; 4] = [
        PolicyKind::Lru,
        PolicyKind::Fifo,
        PolicyKind::Random,
        PolicyKind::Lifetime,
    ];

    /// Whether construction needs the per-file expected lifetime map.
    pub fn needs_lifetimes(self) -> bool {
        matches!(self, PolicyKind::Lifetime)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PolicyKind::Lru => "lru",
            PolicyKind::Fifo => "fifo",
            PolicyKind::Random => "random",
            PolicyKind::Lifetime => "lifetime",
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lru" => Ok(PolicyKind::Lru),
            "fifo" => Ok(PolicyKind::Fifo),
            "random" => Ok(PolicyKind::Random),
            "lifetime" => Ok(PolicyKind::Lifetime),
            _ => Err(ConfigError::UnknownPolicy(s.to_string())),
        }
    }
}

impl TiersimConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        ConfigLoader::new().load()
    }

    /// Load configuration from specific project directory
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }

    /// Parse a single TOML document, without layering.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents).map_err(|source| ConfigError::ParseError {
            path: "<inline>".into(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a single TOML file, without layering.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Simulated-time ceiling in nanoseconds, if one is configured.
    pub fn max_time_ns(&self) -> Option<u64> {
        self.simulation
            .max_time_secs
            .map(|secs| (secs.max(0.0) * 1e9).round() as u64)
    }

    /// Checks the topology for values the kernel cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tiers.is_empty() {
            return Err(ConfigError::ValidationError(
                "at least one tier is required".to_string(),
            ));
        }

        if self.simulation.default_tier_index >= self.tiers.len() {
            return Err(ConfigError::ValidationError(format!(
                "default_tier_index {} is out of range for {} tiers",
                self.simulation.default_tier_index,
                self.tiers.len()
            )));
        }

        let mut names = HashSet::new();
        for tier in &self.tiers {
            if !names.insert(tier.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate tier name `{}`",
                    tier.name
                )));
            }
            if !(tier.throughput.is_finite() && tier.throughput > 0.0) {
                return Err(ConfigError::ValidationError(format!(
                    "tier `{}`: throughput must be positive, got {}",
                    tier.name, tier.throughput
                )));
            }
            if !(tier.latency_secs.is_finite() && tier.latency_secs >= 0.0) {
                return Err(ConfigError::ValidationError(format!(
                    "tier `{}`: latency must be non-negative, got {}",
                    tier.name, tier.latency_secs
                )));
            }
            if !(0.0..1.0).contains(&tier.target_occupation) {
                return Err(ConfigError::ValidationError(format!(
                    "tier `{}`: target_occupation must be in [0, 1), got {}",
                    tier.name, tier.target_occupation
                )));
            }
        }

        Ok(())
    }
}
