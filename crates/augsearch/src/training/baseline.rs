//! Moving-average reward baseline.

use serde::{Deserialize, Serialize};

/// Exponential moving average of the mean batch reward.
///
/// The first update initializes the average to the observed reward.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Baseline {
    decay: f64,
    value: Option<f64>,
}

impl Baseline {
    pub fn new(decay: f64) -> Self {
        Self { decay, value: None }
    }

    pub fn decay(&self) -> f64 {
        self.decay
    }

    /// Current estimate, `None` before the first update
    pub fn value(&self) -> Option<f64> {
        self.value
    }

    /// Estimate `update(reward)` would produce, without storing it
    pub fn peek(&self, reward: f64) -> f64 {
        match self.value {
            Some(prev) => self.decay * prev + (1.0 - self.decay) * reward,
            None => reward,
        }
    }

    /// Fold `reward` into the average and return the new estimate
    pub fn update(&mut self, reward: f64) -> f64 {
        let next = self.peek(reward);
        self.value = Some(next);
        next
    }

    /// Overwrite the estimate, e.g. when resuming from a checkpoint
    pub fn restore(&mut self, value: Option<f64>) {
        self.value = value;
    }

    pub fn reset(&mut self) {
        self.value = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_update_initializes() {
        let mut baseline = Baseline::new(0.95);
        assert!(baseline.value().is_none());
        assert_eq!(baseline.update(2.0), 2.0);
    }

    #[test]
    fn test_moving_average() {
        let mut baseline = Baseline::new(0.5);
        baseline.update(1.0);
        let v = baseline.update(3.0);
        assert!((v - 2.0).abs() < 1e-12);
        let v = baseline.update(0.0);
        assert!((v - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_peek_does_not_commit() {
        let mut baseline = Baseline::new(0.5);
        assert_eq!(baseline.peek(4.0), 4.0);
        assert!(baseline.value().is_none());

        baseline.update(2.0);
        assert!((baseline.peek(4.0) - 3.0).abs() < 1e-12);
        assert_eq!(baseline.value(), Some(2.0));
    }

    #[test]
    fn test_reset_and_restore() {
        let mut baseline = Baseline::new(0.9);
        baseline.update(5.0);
        baseline.reset();
        assert!(baseline.value().is_none());

        baseline.restore(Some(1.5));
        let v = baseline.update(1.5);
        assert!((v - 1.5).abs() < 1e-12);
    }
}
