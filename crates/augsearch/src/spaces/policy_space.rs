//! Full policy domain: a grid of operations

use super::{Field, Operation, OperationSpace, Space};
use crate::policy::PolicyBatch;
use ndarray::Array3;
use rand::Rng;

/// `n_subpolicy` sub-policies of `n_op` operations each.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolicySpace {
    pub n_subpolicy: usize,
    pub n_op: usize,
    pub operation: OperationSpace,
    shape: Vec<usize>,
}

impl PolicySpace {
    pub fn new(n_subpolicy: usize, n_op: usize, operation: OperationSpace) -> Self {
        assert!(
            n_subpolicy > 0 && n_op > 0,
            "Policy space must have at least one operation"
        );
        Self {
            n_subpolicy,
            n_op,
            operation,
            shape: vec![n_subpolicy, n_op, 3],
        }
    }

    /// Check every policy of a batch against the shape and domain bounds
    pub fn contains_batch(&self, batch: &PolicyBatch) -> bool {
        let [_, s, o, f] = batch.shape();
        if s != self.n_subpolicy || o != self.n_op || f != 3 {
            return false;
        }
        batch.operations().all(|op| self.operation.contains(&op))
    }

    /// Describe the first violation in `batch`, if any
    pub fn check_batch(&self, batch: &PolicyBatch) -> Result<(), String> {
        let [_, s, o, f] = batch.shape();
        if s != self.n_subpolicy || o != self.n_op || f != 3 {
            return Err(format!(
                "expected [_, {}, {}, 3], got {:?}",
                self.n_subpolicy,
                self.n_op,
                batch.shape()
            ));
        }
        for (idx, &value) in batch.as_array().indexed_iter() {
            let field = Field::ALL[idx.3];
            if value >= self.operation.size(field) {
                return Err(format!(
                    "{} index {} out of range [0, {}) at {:?}",
                    field.name(),
                    value,
                    self.operation.size(field),
                    idx
                ));
            }
        }
        Ok(())
    }
}

impl Space for PolicySpace {
    type Sample = Array3<usize>;

    fn sample<R: Rng>(&self, rng: &mut R) -> Self::Sample {
        let mut policy = Array3::zeros((self.n_subpolicy, self.n_op, 3));
        for s in 0..self.n_subpolicy {
            for o in 0..self.n_op {
                let op = self.operation.sample(rng);
                for field in Field::ALL {
                    policy[[s, o, field.column()]] = op.get(field);
                }
            }
        }
        policy
    }

    fn contains(&self, value: &Self::Sample) -> bool {
        if value.shape() != self.shape.as_slice() {
            return false;
        }
        value
            .outer_iter()
            .flat_map(|sub| {
                sub.outer_iter()
                    .map(|op| Operation::new(op[0], op[1], op[2]))
                    .collect::<Vec<_>>()
            })
            .all(|op| self.operation.contains(&op))
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_policy_space_sample() {
        let space = PolicySpace::new(5, 2, OperationSpace::new(15, 11, 10));
        let mut rng = rand::rngs::StdRng::seed_from_u64(3);
        let policy = space.sample(&mut rng);

        assert_eq!(policy.shape(), &[5, 2, 3]);
        assert!(space.contains(&policy));
        assert_eq!(space.num_elements(), 30);
    }

    #[test]
    fn test_policy_space_rejects_out_of_range() {
        let space = PolicySpace::new(1, 1, OperationSpace::new(2, 2, 2));
        let mut policy = Array3::zeros((1, 1, 3));
        assert!(space.contains(&policy));
        policy[[0, 0, 2]] = 2;
        assert!(!space.contains(&policy));
    }
}
