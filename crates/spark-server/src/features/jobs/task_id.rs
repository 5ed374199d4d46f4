//! Job identifier generation
//!
//! Identifiers are four random 28-bit values joined by `-`, e.g.
//! `"184467-90213355-7718-250991012"`. Uniqueness is probabilistic; a
//! collision is not detected and results in the later job overwriting the
//! earlier one.

use rand::{rngs::StdRng, Rng, SeedableRng};
use std::sync::Mutex;

/// Exclusive upper bound of each identifier component
pub const COMPONENT_RANGE: u32 = 1 << 28;

/// Number of random components per identifier
pub const COMPONENTS: usize = 4;

/// Source of job identifiers
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Identifier generator backed by a seeded `StdRng`
#[derive(Debug)]
pub struct RandomIdGenerator {
    rng: Mutex<StdRng>,
}

impl RandomIdGenerator {
    /// Seeded from OS entropy, so separate processes never share a sequence
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic sequence for tests
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for RandomIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for RandomIdGenerator {
    fn generate(&self) -> String {
        // A poisoned lock only means another thread panicked mid-draw; the
        // generator state is still usable.
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        (0..COMPONENTS)
            .map(|_| rng.gen_range(0..COMPONENT_RANGE).to_string())
            .collect::<Vec<_>>()
            .join("-")
    }
}
