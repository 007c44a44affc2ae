//! Seeded randomness for reproducible runs.
//!
//! Every random choice in a run draws from a [`SimRng`] derived from the
//! configured seed, so two runs with the same seed and trace make the same
//! decisions. Components that need their own stream take a
//! [`fork`](SimRng::fork) of the master generator:
//!
//! ```text
//! master (seed 42)
//!   ├─> SSD policy rng
//!   └─> HDD policy rng
//! ```

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};

/// Deterministic random number generator.
#[derive(Debug, Clone)]
pub struct SimRng {
    seed: u64,
    inner: SmallRng,
}

impl SimRng {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            inner: SmallRng::seed_from_u64(seed),
        }
    }

    /// Seed this generator was created from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.inner);
    }

    /// Derives an independent generator. The child's stream depends only on
    /// the parent's state at the time of the fork.
    pub fn fork(&mut self) -> Self {
        Self::new(self.next_u64())
    }
}
