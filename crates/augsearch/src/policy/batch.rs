//! Detached policy batches.

use ndarray::{Array4, ArrayView3, Axis};
use serde::{Deserialize, Serialize};
use tch::{Device, Kind, Tensor};

use crate::spaces::Operation;
use crate::{AugError, Result};

/// A batch of sampled policies, shape `[batch, n_subpolicy, n_op, 3]`.
///
/// This is plain data detached from any computation graph; it is what gets
/// handed to the (non-differentiable) augmentation applier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyBatch(Array4<usize>);

impl PolicyBatch {
    pub fn new(array: Array4<usize>) -> Self {
        Self(array)
    }

    /// Build a batch from per-decision index tensors.
    ///
    /// `decisions` holds one `[batch]` integer tensor per sampled field, in
    /// sampling order (sub-policy, then operation, then field).
    pub fn from_decisions(decisions: &[Tensor], n_subpolicy: usize, n_op: usize) -> Result<Self> {
        let expected = n_subpolicy * n_op * 3;
        if decisions.len() != expected {
            return Err(AugError::InvalidPolicy(format!(
                "expected {} decisions, got {}",
                expected,
                decisions.len()
            )));
        }

        // [batch, decisions] on the host
        let stacked = Tensor::stack(decisions, 1)
            .to_kind(Kind::Int64)
            .to_device(Device::Cpu)
            .contiguous();
        let batch = stacked.size()[0] as usize;
        let flat = Vec::<i64>::try_from(stacked.flatten(0, -1))?;

        let data = flat
            .into_iter()
            .map(|v| {
                usize::try_from(v)
                    .map_err(|_| AugError::InvalidPolicy(format!("negative index {}", v)))
            })
            .collect::<Result<Vec<usize>>>()?;

        Ok(Self(Array4::from_shape_vec(
            (batch, n_subpolicy, n_op, 3),
            data,
        )?))
    }

    /// `[batch, n_subpolicy, n_op, 3]`
    pub fn shape(&self) -> [usize; 4] {
        let s = self.0.shape();
        [s[0], s[1], s[2], s[3]]
    }

    pub fn batch_size(&self) -> usize {
        self.0.len_of(Axis(0))
    }

    pub fn n_subpolicy(&self) -> usize {
        self.0.len_of(Axis(1))
    }

    pub fn n_op(&self) -> usize {
        self.0.len_of(Axis(2))
    }

    pub fn as_array(&self) -> &Array4<usize> {
        &self.0
    }

    pub fn into_array(self) -> Array4<usize> {
        self.0
    }

    /// Policy of one batch element, `[n_subpolicy, n_op, 3]`
    pub fn policy(&self, index: usize) -> ArrayView3<'_, usize> {
        self.0.index_axis(Axis(0), index)
    }

    /// Operation at `(batch, subpolicy, op)`
    pub fn operation(&self, batch: usize, subpolicy: usize, op: usize) -> Operation {
        Operation::new(
            self.0[[batch, subpolicy, op, 0]],
            self.0[[batch, subpolicy, op, 1]],
            self.0[[batch, subpolicy, op, 2]],
        )
    }

    /// All operations in row-major order
    pub fn operations(&self) -> impl Iterator<Item = Operation> + '_ {
        let [batch, n_sub, n_op, _] = self.shape();
        (0..batch).flat_map(move |b| {
            (0..n_sub).flat_map(move |s| (0..n_op).map(move |o| self.operation(b, s, o)))
        })
    }

    /// `[batch]` index tensor of one decision, used to replay a policy through the controller
    pub fn decision_tensor(
        &self,
        subpolicy: usize,
        op: usize,
        column: usize,
        device: Device,
    ) -> Tensor {
        let values: Vec<i64> = (0..self.batch_size())
            .map(|b| self.0[[b, subpolicy, op, column]] as i64)
            .collect();
        Tensor::from_slice(&values).to_device(device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_decisions_layout() {
        // batch 2, one sub-policy, two ops
        let decisions: Vec<Tensor> = (0..6i64)
            .map(|d| Tensor::from_slice(&[d, d + 10]))
            .collect();
        let batch = PolicyBatch::from_decisions(&decisions, 1, 2).unwrap();

        assert_eq!(batch.shape(), [2, 1, 2, 3]);
        assert_eq!(batch.operation(0, 0, 0), Operation::new(0, 1, 2));
        assert_eq!(batch.operation(0, 0, 1), Operation::new(3, 4, 5));
        assert_eq!(batch.operation(1, 0, 1), Operation::new(13, 14, 15));
        assert_eq!(batch.operations().count(), 4);
    }

    #[test]
    fn test_from_decisions_wrong_count() {
        let decisions = vec![Tensor::from_slice(&[0i64])];
        assert!(matches!(
            PolicyBatch::from_decisions(&decisions, 1, 1),
            Err(AugError::InvalidPolicy(_))
        ));
    }

    #[test]
    fn test_decision_tensor_roundtrip() {
        let decisions: Vec<Tensor> = (0..3i64).map(|d| Tensor::from_slice(&[d, 2 * d])).collect();
        let batch = PolicyBatch::from_decisions(&decisions, 1, 1).unwrap();
        let column = batch.decision_tensor(0, 0, 2, Device::Cpu);
        assert_eq!(Vec::<i64>::try_from(&column).unwrap(), vec![2, 4]);
    }
}
