//! Single discrete domain

use super::Space;
use rand::Rng;

/// Discrete domain with n possible values: {0, 1, ..., n-1}
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Discrete {
    /// Number of possible values
    pub n: usize,
    /// Cached shape
    shape: Vec<usize>,
}

impl Discrete {
    /// Create a new discrete domain with n values
    pub fn new(n: usize) -> Self {
        assert!(n > 0, "Discrete domain must have at least 1 element");
        Self { n, shape: vec![1] }
    }

    /// Largest index in the domain
    pub fn max_index(&self) -> usize {
        self.n - 1
    }
}

impl Space for Discrete {
    type Sample = usize;

    fn sample<R: Rng>(&self, rng: &mut R) -> Self::Sample {
        rng.gen_range(0..self.n)
    }

    fn contains(&self, value: &Self::Sample) -> bool {
        *value < self.n
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn num_elements(&self) -> usize {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_discrete_sample_in_range() {
        let space = Discrete::new(11);
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);

        for _ in 0..200 {
            let sample = space.sample(&mut rng);
            assert!(space.contains(&sample));
        }
    }

    #[test]
    fn test_discrete_single_element() {
        let space = Discrete::new(1);
        let mut rng = rand::rngs::StdRng::seed_from_u64(0);
        assert_eq!(space.sample(&mut rng), 0);
        assert!(!space.contains(&1));
        assert_eq!(space.max_index(), 0);
        assert_eq!(space.shape(), &[1]);
    }
}
