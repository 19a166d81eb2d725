//! Policy samplers.
//!
//! Provides the two interchangeable samplers:
//! - `Controller` - LSTM controller with log-probability and entropy bookkeeping
//! - `RandomSampler` - Uniform baseline with no learned state

mod batch;
mod controller;
mod distribution;
mod encoder;
mod lstm;
mod random;

pub use batch::PolicyBatch;
pub use controller::{Controller, GroupRecord, SamplingTrace, StepRecord};
pub use distribution::{Categorical, LogitShaping};
pub use encoder::ImageEncoder;
pub use lstm::{RecurrentCore, RecurrentState};
pub use random::RandomSampler;

use crate::spaces::PolicySpace;
use crate::Result;
use tch::{nn, Tensor};

/// Output of one sampler call.
///
/// `policies` is detached plain data for the augmentation applier.
/// `log_probs` and `entropys` (`[batch]`) stay on the autograd graph for the
/// policy-gradient update; samplers without probability bookkeeping leave
/// them as `None`.
pub struct PolicySample {
    pub log_probs: Option<Tensor>,
    pub entropys: Option<Tensor>,
    pub policies: PolicyBatch,
}

impl PolicySample {
    pub fn batch_size(&self) -> usize {
        self.policies.batch_size()
    }

    /// Whether the sample carries policy-gradient statistics
    pub fn has_statistics(&self) -> bool {
        self.log_probs.is_some() && self.entropys.is_some()
    }
}

/// Trait shared by every policy sampler.
pub trait PolicySampler: Send {
    /// Sample one policy per batch element.
    ///
    /// `image` is a `[batch, channels, height, width]` batch. Samplers that do
    /// not condition on images only read its batch dimension.
    fn sample(&self, image: Option<&Tensor>) -> Result<PolicySample>;

    /// Shape and domains of the policies this sampler produces
    fn policy_space(&self) -> &PolicySpace;
}

/// Trait for samplers that have a VarStore for optimization
pub trait HasVarStore {
    /// Get mutable reference to the VarStore
    fn var_store_mut(&mut self) -> &mut nn::VarStore;

    /// Get reference to the VarStore
    fn var_store(&self) -> &nn::VarStore;
}
