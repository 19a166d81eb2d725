//! Controller trainer.

use std::collections::HashMap;
use std::io::Cursor;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tch::{nn, nn::OptimizerConfig, Kind, Tensor};

use super::baseline::Baseline;
use super::config::{TrainerConfig, UpdateRule};
use super::loss::{kl_divergence, ppo_policy_loss, reinforce_loss};
use crate::checkpoint::{CheckpointMetrics, CheckpointState, Checkpointable};
use crate::config::ControllerConfig;
use crate::log::{MetricLogger, NoOpLogger};
use crate::policy::{Controller, HasVarStore, PolicySample, PolicySampler};
use crate::{AugError, Result};

/// Summary of one controller update
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UpdateStats {
    /// Update counter after this update
    pub step: u64,
    /// Final loss value
    pub loss: f64,
    /// Mean reward of the batch
    pub mean_reward: f64,
    /// Baseline used to form advantages
    pub baseline: f64,
    /// Mean joint log-probability of the sampled policies
    pub mean_log_prob: f64,
    /// Mean joint entropy of the sampled policies
    pub mean_entropy: f64,
    /// Approximate KL between sampling and final parameters (0 for REINFORCE)
    pub approx_kl: f64,
}

impl UpdateStats {
    pub fn to_metrics(&self) -> HashMap<String, f64> {
        let mut metrics = HashMap::new();
        metrics.insert("controller/loss".to_string(), self.loss);
        metrics.insert("controller/mean_reward".to_string(), self.mean_reward);
        metrics.insert("controller/baseline".to_string(), self.baseline);
        metrics.insert("controller/log_prob".to_string(), self.mean_log_prob);
        metrics.insert("controller/entropy".to_string(), self.mean_entropy);
        metrics.insert("controller/approx_kl".to_string(), self.approx_kl);
        metrics
    }
}

/// Trains a `Controller` from externally measured rewards.
///
/// Rewards come from the caller (e.g. validation affinity and diversity of
/// the augmented classifier); the trainer turns them into advantages against
/// a moving-average baseline and applies one policy-gradient update per call.
pub struct ControllerTrainer {
    config: TrainerConfig,
    controller: Controller,
    optimizer: nn::Optimizer,
    baseline: Baseline,
    step: u64,
    logger: Box<dyn MetricLogger>,
    last_stats: Option<UpdateStats>,
}

impl ControllerTrainer {
    /// Create a new trainer
    pub fn new(controller: Controller, config: TrainerConfig) -> Result<Self> {
        if config.learning_rate <= 0.0 {
            return Err(AugError::InvalidConfig(format!(
                "learning_rate must be positive, got {}",
                config.learning_rate
            )));
        }
        if !(0.0..1.0).contains(&config.baseline_decay) {
            return Err(AugError::InvalidConfig(format!(
                "baseline_decay must be in [0, 1), got {}",
                config.baseline_decay
            )));
        }
        if let UpdateRule::Ppo { epochs: 0, .. } = config.update_rule {
            return Err(AugError::InvalidConfig("ppo epochs must be > 0".into()));
        }

        let optimizer = nn::Adam::default().build(controller.var_store(), config.learning_rate)?;

        tracing::info!(
            parameters = controller.num_parameters(),
            lr = config.learning_rate,
            rule = ?config.update_rule,
            "Created controller trainer"
        );

        Ok(Self {
            baseline: Baseline::new(config.baseline_decay),
            config,
            controller,
            optimizer,
            step: 0,
            logger: Box::new(NoOpLogger),
            last_stats: None,
        })
    }

    /// Send per-update metrics to `logger`
    pub fn with_logger(mut self, logger: Box<dyn MetricLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut Controller {
        &mut self.controller
    }

    /// Number of updates applied so far
    pub fn step(&self) -> u64 {
        self.step
    }

    pub fn baseline(&self) -> &Baseline {
        &self.baseline
    }

    pub fn last_stats(&self) -> Option<&UpdateStats> {
        self.last_stats.as_ref()
    }

    /// Sample a policy batch from the controller
    pub fn sample(&self, image: Option<&Tensor>) -> Result<PolicySample> {
        self.controller.sample(image)
    }

    /// Apply one update from the rewards measured for `sample`.
    ///
    /// `rewards[i]` belongs to policy `i` of the sample. `image` must be the
    /// batch the sample was drawn with; it is only read by the PPO rule,
    /// which re-scores the policies each epoch.
    pub fn update(
        &mut self,
        sample: &PolicySample,
        image: Option<&Tensor>,
        rewards: &[f64],
    ) -> Result<UpdateStats> {
        let (log_probs, entropys) = match (&sample.log_probs, &sample.entropys) {
            (Some(log_probs), Some(entropys)) => (log_probs, entropys),
            _ => return Err(AugError::MissingStatistics),
        };

        let batch = sample.batch_size();
        if rewards.len() != batch {
            return Err(AugError::ShapeMismatch {
                expected: vec![batch as i64],
                actual: vec![rewards.len() as i64],
            });
        }
        if rewards.iter().any(|r| !r.is_finite()) {
            return Err(AugError::TrainingError("rewards must be finite".into()));
        }

        let mean_reward = rewards.iter().sum::<f64>() / batch as f64;
        // Committed only once the update succeeds
        let baseline = self.baseline.peek(mean_reward);

        let advantages: Vec<f32> = rewards.iter().map(|r| (r - baseline) as f32).collect();
        let advantages = Tensor::from_slice(&advantages).to_device(log_probs.device());

        let mean_log_prob = log_probs.detach().mean(Kind::Float).double_value(&[]);
        let mean_entropy = entropys.detach().mean(Kind::Float).double_value(&[]);

        let (loss, approx_kl) = match self.config.update_rule {
            UpdateRule::Reinforce => {
                let loss = reinforce_loss(
                    log_probs,
                    entropys,
                    &advantages,
                    self.config.entropy_weight,
                );
                let value = self.checked_loss(&loss)?;
                self.apply(&loss);
                (value, 0.0)
            }
            UpdateRule::Ppo { clip_coef, epochs } => {
                let old_log_probs = log_probs.detach();
                self.ppo_update(sample, image, &advantages, &old_log_probs, clip_coef, epochs)?
            }
        };

        self.baseline.update(mean_reward);
        self.step += 1;
        let stats = UpdateStats {
            step: self.step,
            loss,
            mean_reward,
            baseline,
            mean_log_prob,
            mean_entropy,
            approx_kl,
        };

        tracing::debug!(
            step = self.step,
            loss,
            mean_reward,
            baseline,
            entropy = mean_entropy,
            "Controller update"
        );
        self.logger.log_metrics(&stats.to_metrics(), self.step);
        self.last_stats = Some(stats.clone());

        Ok(stats)
    }

    /// Runs every PPO epoch or none of them: parameters are restored if a
    /// later epoch fails.
    fn ppo_update(
        &mut self,
        sample: &PolicySample,
        image: Option<&Tensor>,
        advantages: &Tensor,
        old_log_probs: &Tensor,
        clip_coef: f64,
        epochs: usize,
    ) -> Result<(f64, f64)> {
        let snapshot = if epochs > 1 {
            let mut weights = Vec::new();
            self.controller.var_store().save_to_stream(&mut weights)?;
            Some(weights)
        } else {
            None
        };

        let mut last = (0.0, 0.0);
        for epoch in 0..epochs {
            match self.ppo_epoch(sample, image, advantages, old_log_probs, clip_coef) {
                Ok((loss, approx_kl)) => {
                    tracing::trace!(epoch, loss, approx_kl, "PPO epoch");
                    last = (loss, approx_kl);
                }
                Err(err) => {
                    if let Some(weights) = snapshot.as_ref().filter(|_| epoch > 0) {
                        self.controller
                            .var_store_mut()
                            .load_from_stream(Cursor::new(weights))?;
                        tracing::warn!(epoch, "PPO epoch failed, parameters restored");
                    }
                    return Err(err);
                }
            }
        }
        Ok(last)
    }

    fn ppo_epoch(
        &mut self,
        sample: &PolicySample,
        image: Option<&Tensor>,
        advantages: &Tensor,
        old_log_probs: &Tensor,
        clip_coef: f64,
    ) -> Result<(f64, f64)> {
        let (new_log_probs, new_entropys) = self.controller.score(image, &sample.policies)?;
        let loss = ppo_policy_loss(advantages, &new_log_probs, old_log_probs, clip_coef)
            - self.config.entropy_weight * new_entropys.mean(Kind::Float);
        let value = self.checked_loss(&loss)?;
        self.apply(&loss);

        let approx_kl = kl_divergence(&new_log_probs.detach(), old_log_probs).double_value(&[]);
        Ok((value, approx_kl))
    }

    fn checked_loss(&self, loss: &Tensor) -> Result<f64> {
        let value = loss.double_value(&[]);
        if value.is_finite() {
            Ok(value)
        } else {
            Err(AugError::TrainingError(format!(
                "non-finite loss at step {}",
                self.step
            )))
        }
    }

    fn apply(&mut self, loss: &Tensor) {
        if self.config.max_grad_norm > 0.0 {
            self.optimizer
                .backward_step_clip_norm(loss, self.config.max_grad_norm);
        } else {
            self.optimizer.backward_step(loss);
        }
    }
}

/// SHA-256 of the JSON-serialized controller configuration, hex-encoded
fn config_hash(config: &ControllerConfig) -> Result<String> {
    let json = serde_json::to_vec(config)?;
    let digest = Sha256::digest(&json);
    Ok(digest.iter().map(|b| format!("{:02x}", b)).collect())
}

impl Checkpointable for ControllerTrainer {
    fn save_state(&self) -> Result<Vec<u8>> {
        let mut weights = Vec::new();
        self.controller.var_store().save_to_stream(&mut weights)?;

        let metrics = self
            .last_stats
            .as_ref()
            .map(|s| CheckpointMetrics {
                mean_reward: s.mean_reward,
                loss: s.loss,
                entropy: s.mean_entropy,
                baseline: self.baseline.value(),
            })
            .unwrap_or_else(|| CheckpointMetrics {
                baseline: self.baseline.value(),
                ..Default::default()
            });

        let state = CheckpointState::new(self.step, weights, metrics)
            .with_config_hash(config_hash(self.controller.config())?);
        Ok(serde_json::to_vec(&state)?)
    }

    fn load_state(&mut self, data: &[u8]) -> Result<()> {
        let state: CheckpointState = serde_json::from_slice(data)?;

        let expected = config_hash(self.controller.config())?;
        if !state.config_hash.is_empty() && state.config_hash != expected {
            return Err(AugError::InvalidConfig(format!(
                "checkpoint was written for a different controller configuration ({} != {})",
                state.config_hash, expected
            )));
        }

        self.controller
            .var_store_mut()
            .load_from_stream(Cursor::new(&state.policy_weights))?;
        self.baseline.restore(state.metrics.baseline);
        self.step = state.step;

        tracing::info!(step = state.step, version = %state.version, "Restored controller trainer");
        Ok(())
    }
}
