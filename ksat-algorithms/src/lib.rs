use ahash::RandomState;
use rand::Rng;

mod error;
pub use error::*;

pub mod satisfiability;

/// Hasher keyed from the search's own RNG, so set behaviour never depends on
/// process-level random state.
pub fn seeded_hasher<R: Rng + ?Sized>(rng: &mut R) -> RandomState {
    RandomState::with_seeds(rng.gen(), rng.gen(), rng.gen(), rng.gen())
}
pub(crate) type HashSet<T> = std::collections::HashSet<T, RandomState>;
