//! Discrete search-space types.
//!
//! An augmentation policy is a grid of operations, and every operation is a
//! triple of indices into three fixed discrete domains. These types describe
//! those domains and check sampled values against them.

mod discrete;
mod operation;
mod policy_space;

pub use discrete::Discrete;
pub use operation::{Field, Operation, OperationSpace};
pub use policy_space::PolicySpace;

use rand::Rng;

/// Trait for discrete search spaces
pub trait Space: Clone + Send + Sync {
    /// The type of samples from this space
    type Sample;

    /// Sample a uniformly random element from this space
    fn sample<R: Rng>(&self, rng: &mut R) -> Self::Sample;

    /// Check if a value is contained in this space
    fn contains(&self, value: &Self::Sample) -> bool;

    /// Get the shape of samples from this space
    fn shape(&self) -> &[usize];

    /// Get the total number of elements in a sample
    fn num_elements(&self) -> usize {
        self.shape().iter().product()
    }
}
