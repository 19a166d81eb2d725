//! Controller rewards from classifier measurements.
//!
//! A sampled policy is scored by how much its augmentations shift the
//! classifier (affinity: accuracy on augmented minus accuracy on clean
//! validation data) and how much they diversify training (typically the
//! training loss under augmentation).

use serde::{Deserialize, Serialize};

use crate::{AugError, Result};

/// Element-wise `aug - clean` accuracy difference
pub fn affinity(aug_accs: &[f64], clean_accs: &[f64]) -> Result<Vec<f64>> {
    if aug_accs.len() != clean_accs.len() {
        return Err(AugError::ShapeMismatch {
            expected: vec![clean_accs.len() as i64],
            actual: vec![aug_accs.len() as i64],
        });
    }
    Ok(aug_accs
        .iter()
        .zip(clean_accs)
        .map(|(aug, clean)| aug - clean)
        .collect())
}

/// Weights of the affinity and diversity terms
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    pub aff_w: f64,
    pub div_w: f64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            aff_w: 0.5,
            div_w: 0.5,
        }
    }
}

impl RewardConfig {
    pub fn new(aff_w: f64, div_w: f64) -> Self {
        Self { aff_w, div_w }
    }

    /// Affinity weight `aff_w`, diversity weight `1 - aff_w`
    pub fn balanced(aff_w: f64) -> Self {
        Self::new(aff_w, 1.0 - aff_w)
    }

    /// `aff_w * affinity + div_w * diversity`
    pub fn reward(&self, affinity: f64, diversity: f64) -> f64 {
        self.aff_w * affinity + self.div_w * diversity
    }

    /// Per-policy rewards for a batch
    pub fn rewards(&self, affinity: &[f64], diversity: &[f64]) -> Result<Vec<f64>> {
        if affinity.len() != diversity.len() {
            return Err(AugError::ShapeMismatch {
                expected: vec![affinity.len() as i64],
                actual: vec![diversity.len() as i64],
            });
        }
        Ok(affinity
            .iter()
            .zip(diversity)
            .map(|(&a, &d)| self.reward(a, d))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affinity() {
        let aff = affinity(&[0.8, 0.9], &[0.9, 0.9]).unwrap();
        assert!((aff[0] + 0.1).abs() < 1e-12);
        assert_eq!(aff[1], 0.0);
        assert!(affinity(&[0.8], &[0.9, 0.9]).is_err());
    }

    #[test]
    fn test_reward_weights() {
        let config = RewardConfig::new(2.0, 0.5);
        assert!((config.reward(-0.1, 1.2) - 0.4).abs() < 1e-12);

        let balanced = RewardConfig::balanced(0.25);
        assert_eq!(balanced.div_w, 0.75);
    }

    #[test]
    fn test_batched_rewards() {
        let config = RewardConfig::default();
        let rewards = config.rewards(&[0.0, -0.2], &[1.0, 0.4]).unwrap();
        assert_eq!(rewards.len(), 2);
        assert!((rewards[0] - 0.5).abs() < 1e-12);
        assert!((rewards[1] - 0.1).abs() < 1e-12);
        assert!(config.rewards(&[0.0], &[]).is_err());
    }
}
