//! Controller trainer configuration.

use serde::{Deserialize, Serialize};

/// Policy-gradient estimator used for controller updates
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UpdateRule {
    /// Single REINFORCE step on the sampled log-probabilities
    Reinforce,
    /// Clipped surrogate over `epochs` passes, re-scoring the sampled policies each pass
    Ppo { clip_coef: f64, epochs: usize },
}

impl Default for UpdateRule {
    fn default() -> Self {
        UpdateRule::Reinforce
    }
}

/// Configuration for the controller trainer
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Learning rate
    pub learning_rate: f64,
    /// Entropy bonus coefficient
    pub entropy_weight: f64,
    /// Decay of the moving-average reward baseline
    pub baseline_decay: f64,
    /// Maximum gradient norm (0.0 disables clipping)
    pub max_grad_norm: f64,
    /// Update estimator
    pub update_rule: UpdateRule,
    /// Random seed
    pub seed: u64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            learning_rate: 3.5e-4,
            entropy_weight: 1e-5,
            baseline_decay: 0.95,
            max_grad_norm: 1.0,
            update_rule: UpdateRule::Reinforce,
            seed: 42,
        }
    }
}

impl TrainerConfig {
    /// Set learning rate
    pub fn with_lr(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    /// Set entropy weight
    pub fn with_entropy_weight(mut self, weight: f64) -> Self {
        self.entropy_weight = weight;
        self
    }

    /// Set baseline decay
    pub fn with_baseline_decay(mut self, decay: f64) -> Self {
        self.baseline_decay = decay;
        self
    }

    /// Use the clipped PPO surrogate
    pub fn ppo(mut self, clip_coef: f64, epochs: usize) -> Self {
        self.update_rule = UpdateRule::Ppo { clip_coef, epochs };
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_rule_json() {
        let config = TrainerConfig::default().ppo(0.2, 4);
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains(r#""kind":"ppo""#));

        let restored: TrainerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(
            restored.update_rule,
            UpdateRule::Ppo {
                clip_coef: 0.2,
                epochs: 4
            }
        );
    }

    #[test]
    fn test_defaults_from_empty_json() {
        let config: TrainerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.update_rule, UpdateRule::Reinforce);
        assert_eq!(config.learning_rate, 3.5e-4);
    }
}
