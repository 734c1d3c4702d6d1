//! Backend selection strategies.

mod random;
mod round_robin;

pub use random::Random;
pub use round_robin::RoundRobin;

use crate::config::StrategyKind;

/// Trait for backend selection strategies.
///
/// A strategy only picks candidate indices; liveness probing and bounded
/// retry live in the selector.
pub trait Strategy: Send + Sync {
    /// Produce the next candidate index into a registry of `len` endpoints.
    ///
    /// Called once per selection attempt, so a stateful strategy advances
    /// on failed attempts too.
    ///
    /// # Panics
    ///
    /// May panic if `len` is zero; registries are validated non-empty.
    fn next_index(&self, len: usize) -> usize;
}

/// Instantiate the strategy named in configuration.
pub fn make_strategy(kind: StrategyKind) -> Box<dyn Strategy> {
    match kind {
        StrategyKind::RoundRobin => Box::new(RoundRobin::new()),
        StrategyKind::Random => Box::new(Random::new()),
    }
}
