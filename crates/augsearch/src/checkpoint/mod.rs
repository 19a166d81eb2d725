//! Checkpointing for resumable policy searches.
//!
//! Provides:
//! - `Checkpointable` trait for components that can be saved/restored
//! - `CheckpointManager` for rotation and best-reward tracking
//! - `CheckpointState` for the serialized controller state

mod manager;
mod state;

pub use manager::{CheckpointConfig, CheckpointManager};
pub use state::{CheckpointMetrics, CheckpointState, Checkpointable};
