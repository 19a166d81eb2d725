//! Categorical distributions over shaped logits.

use serde::{Deserialize, Serialize};
use tch::{Kind, Tensor};

/// Logit shaping applied before every categorical decision.
///
/// Divides by `temperature` when set, then bounds with
/// `tanh_constant * tanh(.)` when set. The same shaping must be used for
/// sampling and for re-scoring, otherwise the recorded log-probabilities no
/// longer describe the distribution the gradient is taken through.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LogitShaping {
    pub temperature: Option<f64>,
    pub tanh_constant: Option<f64>,
}

impl LogitShaping {
    pub fn new(tanh_constant: Option<f64>, temperature: Option<f64>) -> Self {
        Self {
            temperature,
            tanh_constant,
        }
    }

    /// No shaping at all
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn apply(&self, logits: &Tensor) -> Tensor {
        let mut shaped = logits.shallow_clone();
        if let Some(temperature) = self.temperature {
            shaped = shaped / temperature;
        }
        if let Some(c) = self.tanh_constant {
            shaped = shaped.tanh() * c;
        }
        shaped
    }
}

/// Categorical distribution parameterized by (already shaped) logits `[batch, n]`.
pub struct Categorical {
    logits: Tensor,
}

impl Categorical {
    pub fn from_logits(logits: Tensor) -> Self {
        Self { logits }
    }

    pub fn logits(&self) -> &Tensor {
        &self.logits
    }

    /// Sample one index per row, `[batch]` Int64
    pub fn sample(&self) -> Tensor {
        tch::no_grad(|| {
            self.logits
                .softmax(-1, Kind::Float)
                .multinomial(1, true)
                .squeeze_dim(-1)
        })
    }

    /// Most likely index per row, `[batch]` Int64
    pub fn mode(&self) -> Tensor {
        self.logits.argmax(-1, false)
    }

    /// Log-probability of `indices` (`[batch]`), `[batch]`
    pub fn log_prob(&self, indices: &Tensor) -> Tensor {
        let log_probs = self.logits.log_softmax(-1, Kind::Float);
        log_probs
            .gather(-1, &indices.to_kind(Kind::Int64).unsqueeze(-1), false)
            .squeeze_dim(-1)
    }

    /// Entropy per row, `[batch]`
    pub fn entropy(&self) -> Tensor {
        let log_probs = self.logits.log_softmax(-1, Kind::Float);
        let probs = log_probs.exp();
        -(probs * log_probs).sum_dim_intlist(Some(&[-1_i64][..]), false, Kind::Float)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::Device;

    #[test]
    fn test_identity_shaping_passes_through() {
        let logits = Tensor::randn([4, 15], (Kind::Float, Device::Cpu)) * 10.0;
        let shaped = LogitShaping::identity().apply(&logits);
        assert!(shaped.equal(&logits));
    }

    #[test]
    fn test_tanh_shaping_is_bounded() {
        let c = 1.5;
        let logits = Tensor::randn([64, 11], (Kind::Float, Device::Cpu)) * 100.0;
        let shaped = LogitShaping::new(Some(c), Some(5.0)).apply(&logits);
        let max_abs = shaped.abs().max().double_value(&[]);
        assert!(max_abs <= c);
    }

    #[test]
    fn test_temperature_divides() {
        let logits = Tensor::from_slice(&[2.0f32, -4.0]).reshape([1, 2]);
        let shaped = LogitShaping::new(None, Some(2.0)).apply(&logits);
        let expected = Tensor::from_slice(&[1.0f32, -2.0]).reshape([1, 2]);
        assert!(shaped.allclose(&expected, 1e-6, 1e-6, false));
    }

    #[test]
    fn test_categorical_sample_in_range() {
        let logits = Tensor::randn([32, 10], (Kind::Float, Device::Cpu));
        let dist = Categorical::from_logits(logits);
        let sample = dist.sample();
        assert_eq!(sample.size(), [32]);
        assert!(sample.min().int64_value(&[]) >= 0);
        assert!(sample.max().int64_value(&[]) < 10);
    }

    #[test]
    fn test_categorical_log_prob_matches_softmax() {
        let logits = Tensor::from_slice(&[1.0f32, 2.0, 3.0]).reshape([1, 3]);
        let dist = Categorical::from_logits(logits.shallow_clone());
        let idx = Tensor::from_slice(&[2i64]);
        let lp = dist.log_prob(&idx).double_value(&[0]);
        let expected = (3.0f64.exp() / (1.0f64.exp() + 2.0f64.exp() + 3.0f64.exp())).ln();
        assert!((lp - expected).abs() < 1e-5);
    }

    #[test]
    fn test_entropy_non_negative_and_uniform_max() {
        let uniform = Categorical::from_logits(Tensor::zeros([1, 4], (Kind::Float, Device::Cpu)));
        let h = uniform.entropy().double_value(&[0]);
        assert!((h - 4.0f64.ln()).abs() < 1e-5);

        let random = Categorical::from_logits(Tensor::randn([16, 7], (Kind::Float, Device::Cpu)));
        assert!(random.entropy().min().double_value(&[]) >= 0.0);
    }

    #[test]
    fn test_single_element_domain_has_zero_entropy() {
        let dist = Categorical::from_logits(Tensor::randn([8, 1], (Kind::Float, Device::Cpu)));
        assert!(dist.entropy().abs().max().double_value(&[]) < 1e-7);
        assert_eq!(dist.sample().max().int64_value(&[]), 0);
        assert!(dist.log_prob(&dist.sample()).abs().max().double_value(&[]) < 1e-7);
    }
}
