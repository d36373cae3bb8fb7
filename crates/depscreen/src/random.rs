//! Explicit random number generators.
//!
//! Nothing in the crate touches a process-wide generator. A run starts from a
//! single seeded master generator; every independent task (a column pair, an
//! HSIC trial) gets its own child generator drawn from its parent in task
//! order, so the streams are disjoint and the results do not depend on which
//! worker runs which task.
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;

/// Generator type used throughout the crate.
pub type DepRng = Xoshiro256Plus;

/// Master generator for a run.
pub fn seeded_rng(seed: u64) -> DepRng {
    DepRng::seed_from_u64(seed)
}

/// Derive `n` child generators from `parent`, in order.
pub fn child_rngs<R: Rng>(parent: &mut R, n: usize) -> Vec<DepRng> {
    (0..n).map(|_| child_rng(parent)).collect()
}

/// Derive one child generator from `parent`.
pub fn child_rng<R: Rng>(parent: &mut R) -> DepRng {
    DepRng::seed_from_u64(parent.gen())
}
