//! Recurrent policy controller.

use tch::{nn, nn::Module, Device, Kind, Tensor};

use super::distribution::{Categorical, LogitShaping};
use super::encoder::ImageEncoder;
use super::lstm::{RecurrentCore, RecurrentState};
use super::{HasVarStore, PolicyBatch, PolicySample, PolicySampler};
use crate::config::ControllerConfig;
use crate::spaces::{Field, PolicySpace};
use crate::{AugError, Result};

/// One recorded categorical decision.
pub struct StepRecord {
    pub subpolicy: usize,
    pub op: usize,
    pub field: Field,
    /// Chosen index `[batch]`
    pub index: Tensor,
    /// Log-probability of the chosen index `[batch]`
    pub log_prob: Tensor,
    /// Entropy of the distribution it was drawn from `[batch]`
    pub entropy: Tensor,
}

/// The hard group-routing decision made before the first step.
pub struct GroupRecord {
    /// Arg-max group per element `[batch]`
    pub group_ids: Tensor,
    /// Unweighted log-probability of that group `[batch]`
    pub log_prob: Tensor,
    /// Weight applied before the term joins the total
    pub weight: f64,
    /// Group embedding fed to the first recurrent step `[batch, lstm_size]`
    pub routed_input: Tensor,
}

/// Every decision of one controller call, in sampling order.
#[derive(Default)]
pub struct SamplingTrace {
    pub steps: Vec<StepRecord>,
    pub group: Option<GroupRecord>,
}

impl SamplingTrace {
    /// Sum of recorded log-probabilities, including the weighted group term
    pub fn total_log_prob(&self) -> Option<Tensor> {
        let mut total = self.steps.iter().map(|s| s.log_prob.shallow_clone()).reduce(|a, b| a + b)?;
        if let Some(group) = &self.group {
            total = total + &group.log_prob * group.weight;
        }
        Some(total)
    }

    /// Sum of recorded entropies
    pub fn total_entropy(&self) -> Option<Tensor> {
        self.steps
            .iter()
            .map(|s| s.entropy.shallow_clone())
            .reduce(|a, b| a + b)
    }
}

/// Group-routing head: image feature -> hard group choice -> group embedding.
#[derive(Debug)]
struct GroupRouter {
    head: nn::Linear,
    embedding: nn::Embedding,
    weight: f64,
}

impl GroupRouter {
    fn route(&self, features: &Tensor) -> (Tensor, GroupRecord) {
        let log_probs = self.head.forward(features).log_softmax(-1, Kind::Float);
        let (log_prob, group_ids) = log_probs.max_dim(-1, false);
        let embedded = self.embedding.forward(&group_ids);
        (
            embedded.shallow_clone(),
            GroupRecord {
                group_ids,
                log_prob,
                weight: self.weight,
                routed_input: embedded,
            },
        )
    }
}

/// Autoregressive LSTM controller sampling augmentation policies.
///
/// Every call generates `n_subpolicy * n_op * 3` decisions. Each decision is
/// one LSTM step whose output is projected onto the field's domain, shaped,
/// and sampled; the sampled index is embedded and becomes the next input.
/// The per-decision log-probabilities and entropies are summed into
/// per-element totals that stay attached to the autograd graph.
pub struct Controller {
    config: ControllerConfig,
    vs: nn::VarStore,
    core: RecurrentCore,
    /// Logit heads in `Field::ALL` order
    heads: Vec<nn::Linear>,
    /// Index embeddings in `Field::ALL` order
    embeddings: Vec<nn::Embedding>,
    encoder: Option<ImageEncoder>,
    /// Learned first input when not conditioning on images, `[1, lstm_size]`
    start: Option<Tensor>,
    groups: Option<GroupRouter>,
    shaping: LogitShaping,
    space: PolicySpace,
    device: Device,
    train: bool,
}

impl Controller {
    /// Create a new controller
    pub fn new(config: ControllerConfig, device: Device) -> Result<Self> {
        config.validate()?;

        let vs = nn::VarStore::new(device);
        let root = vs.root();
        let hidden = config.lstm_size;

        let core = RecurrentCore::new(&(&root / "lstm"), hidden, config.lstm_num_layers);

        let space = PolicySpace::new(config.n_subpolicy, config.n_op, config.operation_space());
        let mut heads = Vec::with_capacity(3);
        let mut embeddings = Vec::with_capacity(3);
        for field in Field::ALL {
            let n = space.operation.size(field) as i64;
            heads.push(nn::linear(
                &root / format!("{}_logit", field.name()),
                hidden,
                n,
                Default::default(),
            ));
            embeddings.push(nn::embedding(
                &root / format!("{}_emb", field.name()),
                n,
                hidden,
                Default::default(),
            ));
        }

        let (encoder, start) = if config.img_input {
            let encoder = ImageEncoder::new(&(&root / "encoder"), config.image_shape, hidden);
            (Some(encoder), None)
        } else {
            let start = root.var("start", &[1, hidden], nn::Init::Uniform { lo: -0.1, up: 0.1 });
            (None, Some(start))
        };

        let n_group = config.n_group as i64;
        let groups = (n_group > 0).then(|| GroupRouter {
            head: nn::linear(&root / "group_logit", hidden, n_group, Default::default()),
            embedding: nn::embedding(&root / "group_emb", n_group, hidden, Default::default()),
            weight: config.gr_prob_weight,
        });

        Self::init_weights(&vs);

        tracing::debug!(
            n_subpolicy = config.n_subpolicy,
            n_op = config.n_op,
            lstm_size = hidden,
            img_input = config.img_input,
            n_group = config.n_group,
            "Created controller"
        );

        Ok(Self {
            shaping: LogitShaping::new(config.tanh_constant, config.temperature),
            config,
            vs,
            core,
            heads,
            embeddings,
            encoder,
            start,
            groups,
            space,
            device,
            train: true,
        })
    }

    /// Uniform(-0.1, 0.1) for linear, embedding and LSTM weights.
    ///
    /// Convolution and batch-norm parameters keep their default init.
    fn init_weights(vs: &nn::VarStore) {
        for (name, mut var) in vs.variables() {
            let in_conv_stack = name.starts_with("encoder.") && !name.starts_with("encoder.fc.");
            if name.contains("weight") && !in_conv_stack {
                tch::no_grad(|| {
                    let _ = var.uniform_(-0.1, 0.1);
                });
            }
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn shaping(&self) -> LogitShaping {
        self.shaping
    }

    /// Switch batch-norm between batch statistics (train) and running statistics (eval)
    pub fn set_train(&mut self, train: bool) {
        self.train = train;
    }

    pub fn is_training(&self) -> bool {
        self.train
    }

    /// Get the number of parameters
    pub fn num_parameters(&self) -> i64 {
        self.vs
            .trainable_variables()
            .iter()
            .map(|v| v.numel() as i64)
            .sum()
    }

    /// Save weights to file
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        Ok(self.vs.save(path)?)
    }

    /// Load weights from file
    pub fn load(&mut self, path: impl AsRef<std::path::Path>) -> Result<()> {
        Ok(self.vs.load(path)?)
    }

    /// Sample a policy batch and also return every recorded decision
    pub fn sample_with_trace(&self, image: Option<&Tensor>) -> Result<(PolicySample, SamplingTrace)> {
        let batch = self.resolve_batch(image, None)?;
        let rollout = self.rollout(image, batch, None)?;
        let policies =
            PolicyBatch::from_decisions(&rollout.decisions, self.config.n_subpolicy, self.config.n_op)?;
        Ok((
            PolicySample {
                log_probs: Some(rollout.log_prob),
                entropys: Some(rollout.entropy),
                policies,
            },
            rollout.trace,
        ))
    }

    /// Re-score a given policy batch under the current parameters.
    ///
    /// Replays the generation loop feeding the policy's own indices instead
    /// of sampling. Returns `(log_probs, entropys)`, each `[batch]`.
    pub fn score(&self, image: Option<&Tensor>, policies: &PolicyBatch) -> Result<(Tensor, Tensor)> {
        self.space
            .check_batch(policies)
            .map_err(AugError::InvalidPolicy)?;
        let batch = self.resolve_batch(image, Some(policies))?;
        let rollout = self.rollout(image, batch, Some(policies))?;
        Ok((rollout.log_prob, rollout.entropy))
    }

    /// Batch size implied by the inputs; validates the image batch
    fn resolve_batch(&self, image: Option<&Tensor>, policies: Option<&PolicyBatch>) -> Result<i64> {
        let batch = match (image, &self.encoder) {
            (Some(image), Some(encoder)) => {
                let size = image.size();
                let [c, h, w] = encoder.input_shape();
                if size.len() != 4 || size[0] == 0 || size[1..] != [c, h, w] {
                    return Err(AugError::ShapeMismatch {
                        expected: vec![-1, c, h, w],
                        actual: size,
                    });
                }
                size[0]
            }
            (None, Some(_)) => return Err(AugError::MissingImage),
            (Some(image), None) => match image.size().first() {
                Some(&n) if n > 0 => n,
                _ => {
                    return Err(AugError::ShapeMismatch {
                        expected: vec![-1],
                        actual: image.size(),
                    })
                }
            },
            (None, None) => policies.map(|p| p.batch_size() as i64).unwrap_or(1),
        };

        if let Some(policies) = policies {
            if policies.batch_size() as i64 != batch {
                return Err(AugError::ShapeMismatch {
                    expected: vec![batch],
                    actual: vec![policies.batch_size() as i64],
                });
            }
        }
        Ok(batch)
    }

    /// First recurrent input `[batch, lstm_size]`
    fn initial_input(&self, image: Option<&Tensor>, batch: i64) -> Result<Tensor> {
        match (&self.encoder, &self.start, image) {
            (Some(encoder), _, Some(image)) => {
                let image = image.to_kind(Kind::Float).to_device(self.device);
                Ok(encoder.forward_t(&image, self.train))
            }
            (_, Some(start), _) => Ok(start.expand([batch, self.config.lstm_size], false)),
            _ => Err(AugError::MissingImage),
        }
    }

    /// The generation loop shared by sampling and scoring
    fn rollout(&self, image: Option<&Tensor>, batch: i64, forced: Option<&PolicyBatch>) -> Result<Rollout> {
        let mut trace = SamplingTrace::default();
        let mut log_prob = Tensor::zeros([batch], (Kind::Float, self.device));
        let mut entropy = Tensor::zeros([batch], (Kind::Float, self.device));
        let mut decisions = Vec::with_capacity(self.config.num_decisions());

        let mut input = self.initial_input(image, batch)?;
        if let Some(router) = &self.groups {
            let (embedded, record) = router.route(&input);
            input = embedded;
            log_prob = log_prob + &record.log_prob * record.weight;
            trace.group = Some(record);
        }

        let mut state: RecurrentState = self.core.zero_state(batch);
        for subpolicy in 0..self.config.n_subpolicy {
            for op in 0..self.config.n_op {
                for field in Field::ALL {
                    let column = field.column();
                    let (output, next) = self.core.step(&input, state);
                    state = next;

                    let logits = self.shaping.apply(&self.heads[column].forward(&output));
                    let dist = Categorical::from_logits(logits);
                    let index = match forced {
                        Some(policies) => policies.decision_tensor(subpolicy, op, column, self.device),
                        None => dist.sample(),
                    };
                    let step_log_prob = dist.log_prob(&index);
                    let step_entropy = dist.entropy();

                    log_prob = log_prob + &step_log_prob;
                    entropy = entropy + &step_entropy;
                    input = self.embeddings[column].forward(&index);

                    decisions.push(index.shallow_clone());
                    trace.steps.push(StepRecord {
                        subpolicy,
                        op,
                        field,
                        index,
                        log_prob: step_log_prob,
                        entropy: step_entropy,
                    });
                }
            }
        }

        Ok(Rollout {
            log_prob,
            entropy,
            decisions,
            trace,
        })
    }
}

struct Rollout {
    log_prob: Tensor,
    entropy: Tensor,
    decisions: Vec<Tensor>,
    trace: SamplingTrace,
}

impl PolicySampler for Controller {
    fn sample(&self, image: Option<&Tensor>) -> Result<PolicySample> {
        self.sample_with_trace(image).map(|(sample, _)| sample)
    }

    fn policy_space(&self) -> &PolicySpace {
        &self.space
    }
}

impl HasVarStore for Controller {
    fn var_store_mut(&mut self) -> &mut nn::VarStore {
        &mut self.vs
    }

    fn var_store(&self) -> &nn::VarStore {
        &self.vs
    }
}
