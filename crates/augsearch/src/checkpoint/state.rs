//! Checkpoint state and trait definitions.

use serde::{Deserialize, Serialize};

use crate::Result;

/// Component whose state can be written to and restored from bytes.
pub trait Checkpointable {
    /// Serialize the component's state to bytes.
    fn save_state(&self) -> Result<Vec<u8>>;

    /// Restore the component's state from bytes.
    fn load_state(&mut self, data: &[u8]) -> Result<()>;
}

/// Search metrics at checkpoint time.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct CheckpointMetrics {
    /// Mean reward of the last update
    pub mean_reward: f64,
    /// Loss of the last update
    pub loss: f64,
    /// Mean policy entropy of the last update
    pub entropy: f64,
    /// Reward baseline, `None` before the first update
    pub baseline: Option<f64>,
}

/// Complete controller checkpoint.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CheckpointState {
    /// Number of controller updates applied
    pub step: u64,
    /// Controller weights as written by `VarStore::save_to_stream`
    pub policy_weights: Vec<u8>,
    pub metrics: CheckpointMetrics,
    /// Fingerprint of the controller configuration
    pub config_hash: String,
    /// Seconds since the Unix epoch
    pub timestamp: String,
    /// Library version that wrote the checkpoint
    pub version: String,
}

impl CheckpointState {
    pub fn new(step: u64, policy_weights: Vec<u8>, metrics: CheckpointMetrics) -> Self {
        Self {
            step,
            policy_weights,
            metrics,
            config_hash: String::new(),
            timestamp: unix_timestamp(),
            version: crate::VERSION.to_string(),
        }
    }

    /// Set config hash.
    pub fn with_config_hash(mut self, hash: String) -> Self {
        self.config_hash = hash;
        self
    }
}

fn unix_timestamp() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    duration.as_secs().to_string()
}
