//! Sources for the random `until` offset of each query

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Exclusive upper bound of an `until` offset: one day minus one second
pub const DAY_RANGE_SECS: u64 = 86_399;

/// Draws the `until` offset, in seconds, for a query.
///
/// Implementations are called concurrently from every worker of a group and
/// must return values in `[0, DAY_RANGE_SECS)` without blocking.
pub trait OffsetSource: Send + Sync + fmt::Debug {
    fn draw_until(&self) -> u64;
}

/// Draws from the calling thread's own `rand::thread_rng()`.
///
/// Each worker thread owns a separate generator, so concurrent draws never
/// touch shared state.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRngOffsets;

impl OffsetSource for ThreadRngOffsets {
    fn draw_until(&self) -> u64 {
        rand::thread_rng().gen_range(0..DAY_RANGE_SECS)
    }
}

/// Deterministic, lock-free offsets for reproducible runs and tests.
///
/// Every draw takes a fresh stream of a ChaCha8 generator seeded once at
/// construction; the stream number comes from an atomic counter. The `n`th
/// draw therefore always yields the same value for a given seed, whichever
/// thread performs it.
pub struct SeededOffsets {
    seed: u64,
    draws: AtomicU64,
}

impl SeededOffsets {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            draws: AtomicU64::new(0),
        }
    }

    /// Number of offsets drawn so far
    pub fn draws(&self) -> u64 {
        self.draws.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for SeededOffsets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeededOffsets")
            .field("seed", &self.seed)
            .field("draws", &self.draws())
            .finish()
    }
}

impl OffsetSource for SeededOffsets {
    fn draw_until(&self) -> u64 {
        let stream = self.draws.fetch_add(1, Ordering::Relaxed);
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        rng.set_stream(stream);
        rng.gen_range(0..DAY_RANGE_SECS)
    }
}
