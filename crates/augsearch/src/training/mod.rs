//! Policy-gradient training for the controller.
//!
//! Provides:
//! - `ControllerTrainer` - Owns a controller and its optimizer, applies updates from rewards
//! - `Baseline` - Moving-average reward baseline
//! - REINFORCE and clipped PPO losses

mod baseline;
mod config;
mod loss;
mod trainer;

pub use baseline::Baseline;
pub use config::{TrainerConfig, UpdateRule};
pub use loss::{kl_divergence, ppo_policy_loss, reinforce_loss};
pub use trainer::{ControllerTrainer, UpdateStats};
