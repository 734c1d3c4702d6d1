//! Round-robin selection strategy.

use super::Strategy;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Round-robin strategy.
///
/// Cycles through the registry in order. The cursor persists across
/// connections and advances on every attempt, so a failed probe does not
/// bias subsequent selections back toward the same dead backend. The atomic
/// fetch-add serializes concurrent selections: no two callers observe the
/// same cursor value.
pub struct RoundRobin {
    cursor: AtomicUsize,
}

impl RoundRobin {
    /// Create a round-robin strategy whose first candidate is index 0.
    pub fn new() -> Self {
        Self {
            cursor: AtomicUsize::new(0),
        }
    }
}

impl Default for RoundRobin {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for RoundRobin {
    fn next_index(&self, len: usize) -> usize {
        self.cursor.fetch_add(1, Ordering::Relaxed) % len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_robin_cycles() {
        let rr = RoundRobin::new();

        assert_eq!(rr.next_index(3), 0);
        assert_eq!(rr.next_index(3), 1);
        assert_eq!(rr.next_index(3), 2);
        assert_eq!(rr.next_index(3), 0); // Cycles back
    }

    #[test]
    fn test_round_robin_single_endpoint() {
        let rr = RoundRobin::new();

        assert_eq!(rr.next_index(1), 0);
        assert_eq!(rr.next_index(1), 0);
    }

    #[test]
    fn test_round_robin_fairness() {
        let rr = RoundRobin::new();
        let mut counts = [0usize; 4];

        for _ in 0..42 {
            counts[rr.next_index(4)] += 1;
        }

        // 42 draws over 4 endpoints: counts differ by at most 1
        let min = counts.iter().min().unwrap();
        let max = counts.iter().max().unwrap();
        assert!(max - min <= 1, "unfair distribution: {counts:?}");
    }
}
