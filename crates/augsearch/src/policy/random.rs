//! Uniform random policy sampler.

use std::sync::Mutex;

use ndarray::Array4;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tch::Tensor;

use super::{PolicyBatch, PolicySample, PolicySampler};
use crate::config::ControllerConfig;
use crate::spaces::{Field, OperationSpace, PolicySpace, Space};
use crate::{AugError, Result};

/// Draws every index independently and uniformly over its domain.
///
/// Has no learned parameters and no recurrent state. Returns no
/// log-probabilities or entropies, so it can stand in for the controller as
/// a no-learning control arm.
pub struct RandomSampler {
    space: PolicySpace,
    /// Seeded generator; `None` uses the thread-local RNG
    rng: Option<Mutex<StdRng>>,
}

impl RandomSampler {
    pub fn new(n_subpolicy: usize, n_op: usize, operation: OperationSpace) -> Self {
        Self {
            space: PolicySpace::new(n_subpolicy, n_op, operation),
            rng: None,
        }
    }

    /// Sampler with the same policy shape as a controller configuration
    pub fn from_config(config: &ControllerConfig) -> Self {
        Self::new(config.n_subpolicy, config.n_op, config.operation_space())
    }

    /// Use a seeded generator for reproducible draws
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Some(Mutex::new(StdRng::seed_from_u64(seed)));
        self
    }

    fn fill<R: Rng>(&self, batch: usize, rng: &mut R) -> Array4<usize> {
        let mut policies = Array4::zeros((batch, self.space.n_subpolicy, self.space.n_op, 3));
        for b in 0..batch {
            for s in 0..self.space.n_subpolicy {
                for o in 0..self.space.n_op {
                    let op = self.space.operation.sample(rng);
                    for field in Field::ALL {
                        policies[[b, s, o, field.column()]] = op.get(field);
                    }
                }
            }
        }
        policies
    }
}

impl PolicySampler for RandomSampler {
    fn sample(&self, image: Option<&Tensor>) -> Result<PolicySample> {
        let batch = match image {
            Some(image) => match image.size().first() {
                Some(&n) => n as usize,
                None => {
                    return Err(AugError::ShapeMismatch {
                        expected: vec![-1],
                        actual: vec![],
                    })
                }
            },
            None => 1,
        };

        let policies = match &self.rng {
            Some(rng) => {
                let mut rng = rng
                    .lock()
                    .map_err(|_| AugError::TrainingError("random sampler lock poisoned".into()))?;
                self.fill(batch, &mut *rng)
            }
            None => self.fill(batch, &mut rand::thread_rng()),
        };

        Ok(PolicySample {
            log_probs: None,
            entropys: None,
            policies: PolicyBatch::new(policies),
        })
    }

    fn policy_space(&self) -> &PolicySpace {
        &self.space
    }
}
