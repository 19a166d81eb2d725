//! # augsearch
//!
//! Learned data-augmentation policy search for image classifiers.
//!
//! ## Overview
//!
//! augsearch provides:
//! - A recurrent `Controller` that autoregressively samples augmentation
//!   policies and reports the log-probability and entropy needed for
//!   policy-gradient training
//! - A `RandomSampler` baseline implementing the same `PolicySampler` contract
//! - A `ControllerTrainer` running REINFORCE or clipped PPO updates from
//!   externally measured rewards
//! - The augmentation catalogue and a decoder from sampled indices to
//!   concrete operations
//! - Checkpointing and metric logging for long-running searches
//!
//! ## Features
//!
//! - `default` - Core functionality (requires libtorch through `tch`)
//! - `tensorboard` - TensorBoard metric logging
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use augsearch::prelude::*;
//! use tch::{Device, Kind, Tensor};
//!
//! let config = ControllerConfig::default().with_img_input(false);
//! let controller = Controller::new(config, Device::Cpu)?;
//!
//! let images = Tensor::zeros([4, 3, 32, 32], (Kind::Float, Device::Cpu));
//! let sample = controller.sample(Some(&images))?;
//! assert_eq!(sample.policies.shape(), [4, 2, 2, 3]);
//! ```

pub mod augment;
pub mod checkpoint;
pub mod config;
pub mod log;
pub mod policy;
pub mod reward;
pub mod spaces;
pub mod training;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::augment::{augment_list, remove_duplicates, DecodedOp, PolicyDecoder};
    pub use crate::config::{ControllerConfig, SearchConfig};
    pub use crate::policy::{
        Controller, HasVarStore, PolicyBatch, PolicySample, PolicySampler, RandomSampler,
    };
    pub use crate::reward::RewardConfig;
    pub use crate::spaces::{Field, Operation, OperationSpace, PolicySpace, Space};
    pub use crate::training::{ControllerTrainer, TrainerConfig, UpdateRule, UpdateStats};

    pub use crate::checkpoint::{CheckpointConfig, CheckpointManager, Checkpointable};

    #[cfg(feature = "tensorboard")]
    pub use crate::log::TensorBoardLogger;
    pub use crate::log::{CompositeLogger, ConsoleLogger, MetricLogger, NoOpLogger};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Error types for the library
#[derive(Debug, thiserror::Error)]
pub enum AugError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<i64>,
        actual: Vec<i64>,
    },

    #[error("An image batch is required when image conditioning is enabled")]
    MissingImage,

    #[error("Sample carries no log-probabilities; it was not produced by a controller")]
    MissingStatistics,

    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Array shape error: {0}")]
    ArrayError(#[from] ndarray::ShapeError),

    #[error("Tensor error: {0}")]
    TensorError(#[from] tch::TchError),
}

pub type Result<T> = core::result::Result<T, AugError>;
