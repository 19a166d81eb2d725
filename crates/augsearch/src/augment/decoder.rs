//! Index-triple to operation decoding.

use std::collections::HashSet;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::catalogue::{augment_list, Augmentation};
use crate::policy::PolicyBatch;
use crate::spaces::{Field, OperationSpace};
use crate::{AugError, Result};

/// A concrete operation: apply `name` with probability `prob` at `level`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecodedOp {
    pub name: String,
    /// Application probability in `[0, 1]`
    pub prob: f64,
    /// Normalized magnitude in `[0, 1]`
    pub level: f64,
    pub min: f64,
    pub max: f64,
}

impl DecodedOp {
    fn new(aug: &Augmentation, prob: f64, level: f64) -> Self {
        Self {
            name: aug.name.to_string(),
            prob,
            level,
            min: aug.min,
            max: aug.max,
        }
    }

    /// Level mapped into the operation's magnitude range
    pub fn magnitude(&self) -> f64 {
        self.level * (self.max - self.min) + self.min
    }
}

/// Operations applied in sequence
pub type SubPolicy = Vec<DecodedOp>;

/// Maps bucket indices to probabilities and levels.
#[derive(Clone, Debug)]
pub struct PolicyDecoder {
    space: OperationSpace,
}

impl PolicyDecoder {
    pub fn new(space: OperationSpace) -> Result<Self> {
        let types = space.size(Field::OpType);
        if types > augment_list().len() {
            return Err(AugError::InvalidConfig(format!(
                "{} operation types exceed the {}-entry catalogue",
                types,
                augment_list().len()
            )));
        }
        Ok(Self { space })
    }

    /// Bucket `index` of a domain of `size` as a value in `[0, 1]`
    fn normalize(index: usize, size: usize) -> f64 {
        if size <= 1 {
            0.0
        } else {
            index as f64 / (size - 1) as f64
        }
    }

    /// Decode policy `index` of the batch into its sub-policies
    pub fn decode(&self, policies: &PolicyBatch, index: usize) -> Result<Vec<SubPolicy>> {
        if index >= policies.batch_size() {
            return Err(AugError::InvalidPolicy(format!(
                "policy {} out of range for batch of {}",
                index,
                policies.batch_size()
            )));
        }

        let n_prob = self.space.size(Field::Prob);
        let n_mag = self.space.size(Field::Magnitude);

        (0..policies.n_subpolicy())
            .map(|s| {
                (0..policies.n_op())
                    .map(|o| -> Result<DecodedOp> {
                        let op = policies.operation(index, s, o);
                        let aug = augment_list()
                            .get(op.op_type)
                            .filter(|_| op.op_type < self.space.size(Field::OpType))
                            .ok_or_else(|| {
                                AugError::InvalidPolicy(format!(
                                    "operation type {} is not in the catalogue",
                                    op.op_type
                                ))
                            })?;
                        if op.prob_bucket >= n_prob || op.mag_bucket >= n_mag {
                            return Err(AugError::InvalidPolicy(format!(
                                "bucket ({}, {}) outside ({}, {})",
                                op.prob_bucket, op.mag_bucket, n_prob, n_mag
                            )));
                        }
                        Ok(DecodedOp::new(
                            aug,
                            Self::normalize(op.prob_bucket, n_prob),
                            Self::normalize(op.mag_bucket, n_mag),
                        ))
                    })
                    .collect()
            })
            .collect()
    }

    /// Decode every policy of the batch
    pub fn decode_all(&self, policies: &PolicyBatch) -> Result<Vec<Vec<SubPolicy>>> {
        (0..policies.batch_size())
            .map(|i| self.decode(policies, i))
            .collect()
    }
}

/// Drop sub-policies whose operation-name sequence already appeared.
///
/// Keeps first occurrences in their original order.
pub fn remove_duplicates(policies: Vec<SubPolicy>) -> Vec<SubPolicy> {
    let mut seen = HashSet::new();
    policies
        .into_iter()
        .filter(|sub| seen.insert(sub.iter().map(|op| op.name.clone()).collect::<Vec<_>>()))
        .collect()
}

/// Uniformly random continuous policy of `n_policy` sub-policies
pub fn random_policy<R: Rng>(n_policy: usize, n_op: usize, rng: &mut R) -> Vec<SubPolicy> {
    let catalogue = augment_list();
    (0..n_policy)
        .map(|_| {
            (0..n_op)
                .map(|_| {
                    let aug = &catalogue[rng.gen_range(0..catalogue.len())];
                    DecodedOp::new(aug, rng.gen::<f64>(), rng.gen::<f64>())
                })
                .collect()
        })
        .collect()
}
