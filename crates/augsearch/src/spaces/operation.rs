//! Operation triples and their three-field domain

use super::{Discrete, Space};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// One of the three discrete fields of an operation, in sampling order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    /// Which augmentation to apply
    OpType,
    /// Probability bucket the augmentation fires with
    Prob,
    /// Magnitude bucket of the augmentation
    Magnitude,
}

impl Field {
    /// All fields in the order the controller samples them
    pub const ALL: [Field; 3] = [Field::OpType, Field::Prob, Field::Magnitude];

    /// Column of this field in a policy array
    pub fn column(self) -> usize {
        match self {
            Field::OpType => 0,
            Field::Prob => 1,
            Field::Magnitude => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Field::OpType => "type",
            Field::Prob => "prob",
            Field::Magnitude => "magnitude",
        }
    }
}

/// A single sampled operation: `(operation_type, probability_bucket, magnitude_bucket)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Operation {
    pub op_type: usize,
    pub prob_bucket: usize,
    pub mag_bucket: usize,
}

impl Operation {
    pub fn new(op_type: usize, prob_bucket: usize, mag_bucket: usize) -> Self {
        Self {
            op_type,
            prob_bucket,
            mag_bucket,
        }
    }

    /// Index stored for `field`
    pub fn get(&self, field: Field) -> usize {
        match field {
            Field::OpType => self.op_type,
            Field::Prob => self.prob_bucket,
            Field::Magnitude => self.mag_bucket,
        }
    }

    pub fn as_array(&self) -> [usize; 3] {
        [self.op_type, self.prob_bucket, self.mag_bucket]
    }
}

impl From<[usize; 3]> for Operation {
    fn from(v: [usize; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

/// The three discrete domains an operation is drawn from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperationSpace {
    op_type: Discrete,
    prob: Discrete,
    magnitude: Discrete,
    shape: Vec<usize>,
}

impl OperationSpace {
    /// Create a new operation space
    ///
    /// # Panics
    /// If any domain is empty.
    pub fn new(operation_types: usize, operation_prob: usize, operation_mag: usize) -> Self {
        Self {
            op_type: Discrete::new(operation_types),
            prob: Discrete::new(operation_prob),
            magnitude: Discrete::new(operation_mag),
            shape: vec![3],
        }
    }

    /// Domain of `field`
    pub fn domain(&self, field: Field) -> &Discrete {
        match field {
            Field::OpType => &self.op_type,
            Field::Prob => &self.prob,
            Field::Magnitude => &self.magnitude,
        }
    }

    /// Size of the domain of `field`
    pub fn size(&self, field: Field) -> usize {
        self.domain(field).n
    }

    /// Domain sizes in column order
    pub fn sizes(&self) -> [usize; 3] {
        [self.op_type.n, self.prob.n, self.magnitude.n]
    }
}

impl Space for OperationSpace {
    type Sample = Operation;

    fn sample<R: Rng>(&self, rng: &mut R) -> Self::Sample {
        Operation::new(
            self.op_type.sample(rng),
            self.prob.sample(rng),
            self.magnitude.sample(rng),
        )
    }

    fn contains(&self, value: &Self::Sample) -> bool {
        Field::ALL
            .iter()
            .all(|&f| self.domain(f).contains(&value.get(f)))
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
    fn test_operation_space_sample() {
        let space = OperationSpace::new(15, 11, 10);
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);

        for _ in 0..500 {
            let op = space.sample(&mut rng);
            assert!(space.contains(&op));
            assert!(op.op_type < 15 && op.prob_bucket < 11 && op.mag_bucket < 10);
        }
    }

    #[test]
    fn test_operation_space_contains() {
        let space = OperationSpace::new(3, 4, 5);
        assert!(space.contains(&Operation::new(2, 3, 4)));
        assert!(!space.contains(&Operation::new(3, 0, 0)));
        assert!(!space.contains(&Operation::new(0, 4, 0)));
        assert!(!space.contains(&Operation::new(0, 0, 5)));
    }

    #[test]
    fn test_field_columns() {
        let op = Operation::from([4, 5, 6]);
        for field in Field::ALL {
            assert_eq!(op.get(field), op.as_array()[field.column()]);
        }
        assert_eq!(OperationSpace::new(15, 11, 10).size(Field::Prob), 11);
    }
}
