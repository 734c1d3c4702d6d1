//! Random selection strategy.

use super::Strategy;
use rand::Rng;

/// Uniform random strategy.
///
/// Draws an independent index per attempt. Repeated draws within one
/// selection may revisit the same dead backend; the selector's attempt
/// bound still terminates the loop.
pub struct Random;

impl Random {
    pub fn new() -> Self {
        Self
    }
}

impl Default for Random {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for Random {
    fn next_index(&self, len: usize) -> usize {
        rand::rng().random_range(0..len)
    }
}
