//! Controller and search configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::reward::RewardConfig;
use crate::spaces::OperationSpace;
use crate::training::TrainerConfig;
use crate::{AugError, Result};

/// Construction-time configuration of the policy controller.
///
/// Fixed for the lifetime of a `Controller`. Defaults follow the reference
/// search setup: two sub-policies of two operations, 15 operation types,
/// 11 probability buckets and 10 magnitude buckets.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    // Policy shape
    /// Number of sub-policies per policy
    pub n_subpolicy: usize,
    /// Number of operations per sub-policy
    pub n_op: usize,

    // Discrete domains
    /// Number of operation types
    pub operation_types: usize,
    /// Number of probability buckets
    pub operation_prob: usize,
    /// Number of magnitude buckets
    pub operation_mag: usize,

    // Recurrent unit
    /// LSTM hidden width (also the embedding width)
    pub lstm_size: i64,
    /// Number of stacked LSTM layers
    pub lstm_num_layers: i64,

    // Logit shaping
    /// Bound applied as `c * tanh(logits)`; `None` disables it
    pub tanh_constant: Option<f64>,
    /// Logit divisor; `None` disables it
    pub temperature: Option<f64>,

    // Image conditioning
    /// Derive the first recurrent input from the image batch
    pub img_input: bool,
    /// Expected `[channels, height, width]` of the image batch
    pub image_shape: [i64; 3],

    // Group routing
    /// Number of image groups; 0 disables group routing
    pub n_group: usize,
    /// Weight of the group log-probability in the accumulated total
    pub gr_prob_weight: f64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            n_subpolicy: 2,
            n_op: 2,

            operation_types: 15,
            operation_prob: 11,
            operation_mag: 10,

            lstm_size: 100,
            lstm_num_layers: 1,

            tanh_constant: Some(1.5),
            temperature: None,

            img_input: true,
            image_shape: [3, 32, 32],

            n_group: 0,
            gr_prob_weight: 1e-3,
        }
    }
}

impl ControllerConfig {
    /// Set the policy shape
    pub fn with_shape(mut self, n_subpolicy: usize, n_op: usize) -> Self {
        self.n_subpolicy = n_subpolicy;
        self.n_op = n_op;
        self
    }

    /// Set the three discrete domain sizes
    pub fn with_domains(mut self, types: usize, prob: usize, mag: usize) -> Self {
        self.operation_types = types;
        self.operation_prob = prob;
        self.operation_mag = mag;
        self
    }

    /// Set the recurrent width and depth
    pub fn with_lstm(mut self, size: i64, num_layers: i64) -> Self {
        self.lstm_size = size;
        self.lstm_num_layers = num_layers;
        self
    }

    /// Set the logit shaping parameters
    pub fn with_shaping(mut self, tanh_constant: Option<f64>, temperature: Option<f64>) -> Self {
        self.tanh_constant = tanh_constant;
        self.temperature = temperature;
        self
    }

    /// Enable or disable image conditioning
    pub fn with_img_input(mut self, img_input: bool) -> Self {
        self.img_input = img_input;
        self
    }

    /// Set the expected image shape
    pub fn with_image_shape(mut self, channels: i64, height: i64, width: i64) -> Self {
        self.image_shape = [channels, height, width];
        self
    }

    /// Enable group routing with `n_group` groups
    pub fn with_groups(mut self, n_group: usize, gr_prob_weight: f64) -> Self {
        self.n_group = n_group;
        self.gr_prob_weight = gr_prob_weight;
        self
    }

    /// The operation domain described by this configuration
    pub fn operation_space(&self) -> OperationSpace {
        OperationSpace::new(self.operation_types, self.operation_prob, self.operation_mag)
    }

    /// Number of discrete decisions made per policy
    pub fn num_decisions(&self) -> usize {
        self.n_subpolicy * self.n_op * 3
    }

    /// Check the configuration for values the controller cannot be built from
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(AugError::InvalidConfig(msg.to_string()));

        if self.n_subpolicy == 0 || self.n_op == 0 {
            return invalid("n_subpolicy and n_op must be positive");
        }
        if self.operation_types == 0 || self.operation_prob == 0 || self.operation_mag == 0 {
            return invalid("operation domains must have at least one element");
        }
        if self.lstm_size <= 0 || self.lstm_num_layers <= 0 {
            return invalid("lstm_size and lstm_num_layers must be positive");
        }
        if matches!(self.temperature, Some(t) if !(t > 0.0)) {
            return invalid("temperature must be positive");
        }
        if matches!(self.tanh_constant, Some(c) if !(c > 0.0)) {
            return invalid("tanh_constant must be positive");
        }
        if self.img_input {
            let [channels, height, width] = self.image_shape;
            // Three stride-2 convolutions followed by a 2x2 pool
            if channels <= 0 || height < 16 || width < 16 {
                return invalid("image_shape must have channels > 0 and spatial size >= 16");
            }
        }
        Ok(())
    }
}

/// Complete search configuration, loadable from a JSON file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub controller: ControllerConfig,
    pub trainer: TrainerConfig,
    pub reward: RewardConfig,
}

impl SearchConfig {
    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        let config: Self = serde_json::from_reader(std::io::BufReader::new(file))?;
        config.controller.validate()?;
        tracing::debug!(path = %path.as_ref().display(), "Loaded search config");
        Ok(config)
    }

    /// Write the configuration as pretty-printed JSON
    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        let config = ControllerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.num_decisions(), 12);
        assert_eq!(config.operation_space().sizes(), [15, 11, 10]);
    }

    #[test]
    fn test_invalid_configs_rejected() {
        let zero_domain = ControllerConfig::default().with_domains(0, 11, 10);
        assert!(matches!(zero_domain.validate(), Err(AugError::InvalidConfig(_))));

        let bad_temp = ControllerConfig::default().with_shaping(Some(1.5), Some(0.0));
        assert!(bad_temp.validate().is_err());

        let tiny_image = ControllerConfig::default().with_image_shape(3, 8, 8);
        assert!(tiny_image.validate().is_err());

        // Image shape is irrelevant without image conditioning
        let no_image = tiny_image.with_img_input(false);
        assert!(no_image.validate().is_ok());
    }

    #[test]
    fn test_negative_group_count_does_not_parse() {
        let result = serde_json::from_str::<ControllerConfig>(r#"{"n_group": -1}"#);
        assert!(result.is_err());

        let config: ControllerConfig = serde_json::from_str(r#"{"n_group": 4}"#).unwrap();
        assert_eq!(config.n_group, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_search_config_partial_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("search.json");
        std::fs::write(&path, r#"{"controller": {"n_subpolicy": 5, "img_input": false}}"#)
            .unwrap();

        let config = SearchConfig::from_json_file(&path).unwrap();
        assert_eq!(config.controller.n_subpolicy, 5);
        assert_eq!(config.controller.n_op, 2);
        assert!(!config.controller.img_input);
        assert_eq!(config.trainer.entropy_weight, TrainerConfig::default().entropy_weight);
    }

    #[test]
    fn test_search_config_roundtrip_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.json");
        let config = SearchConfig {
            controller: ControllerConfig::default().with_groups(3, 1e-2),
            ..Default::default()
        };
        config.to_json_file(&path).unwrap();

        let loaded = SearchConfig::from_json_file(&path).unwrap();
        assert_eq!(loaded.controller, config.controller);
    }
}
