//! Decile progress notifications
//!
//! A [`DecileTracker`] belongs to a single load run. It hands out each
//! threshold (10%, 20%, ..., 100%) at most once, in increasing order, the
//! first time committed rows reach it.

use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct DecileTracker {
    total_rows: u64,
    remaining: VecDeque<u8>,
}

impl DecileTracker {
    pub fn new(total_rows: u64) -> Self {
        Self {
            total_rows,
            remaining: (1..=10).map(|decile| decile * 10).collect(),
        }
    }

    fn reached(&self, percent: u8, committed: u64) -> bool {
        self.total_rows > 0
            && u128::from(committed) * 100 >= u128::from(percent) * u128::from(self.total_rows)
    }

    /// Thresholds newly reached by `committed` rows, in increasing order
    pub fn advance(&mut self, committed: u64) -> Vec<u8> {
        let mut crossed = Vec::new();
        while let Some(&percent) = self.remaining.front() {
            if !self.reached(percent, committed) {
                break;
            }
            crossed.push(percent);
            self.remaining.pop_front();
        }
        crossed
    }

    /// Drop thresholds already covered before this run started
    pub fn skip_committed(&mut self, committed: u64) {
        self.advance(committed);
    }

    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_batch_can_cross_several_deciles() {
        let mut tracker = DecileTracker::new(57);
        let fired: Vec<Vec<u8>> = [10, 20, 30, 40, 50, 57]
            .iter()
            .map(|&committed| tracker.advance(committed))
            .collect();

        assert_eq!(
            fired,
            vec![vec![10], vec![20, 30], vec![40, 50], vec![60, 70], vec![80], vec![90, 100]]
        );
        assert_eq!(tracker.remaining(), 0);
    }

    #[test]
    fn test_each_threshold_fires_once() {
        let mut tracker = DecileTracker::new(100);
        assert_eq!(tracker.advance(15), vec![10]);
        assert!(tracker.advance(15).is_empty());
        assert!(tracker.advance(19).is_empty());
        assert_eq!(tracker.advance(20), vec![20]);
    }

    #[test]
    fn test_exact_boundaries_fire() {
        let mut tracker = DecileTracker::new(25);
        assert!(tracker.advance(2).is_empty());
        assert_eq!(tracker.advance(3), vec![10]);
        assert_eq!(tracker.advance(25), vec![20, 30, 40, 50, 60, 70, 80, 90, 100]);
    }

    #[test]
    fn test_skip_committed_is_silent_and_final() {
        let mut tracker = DecileTracker::new(10);
        tracker.skip_committed(5);
        assert_eq!(tracker.remaining(), 5);
        assert_eq!(tracker.advance(6), vec![60]);
    }

    #[test]
    fn test_empty_dataset_never_fires() {
        let mut tracker = DecileTracker::new(0);
        assert!(tracker.advance(0).is_empty());
        assert_eq!(tracker.remaining(), 10);
    }
}
