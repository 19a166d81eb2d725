//! Policy-gradient losses for the controller.

use tch::{Kind, Tensor};

/// REINFORCE loss with entropy bonus.
///
/// `mean(-advantage * log_prob) - entropy_weight * mean(entropy)`
///
/// # Arguments
/// * `log_probs` - Joint policy log-probabilities [B], attached to the graph
/// * `entropys` - Joint policy entropies [B], attached to the graph
/// * `advantages` - Reward minus baseline [B], treated as constant
/// * `entropy_weight` - Entropy bonus coefficient
pub fn reinforce_loss(
    log_probs: &Tensor,
    entropys: &Tensor,
    advantages: &Tensor,
    entropy_weight: f64,
) -> Tensor {
    let policy_loss = -(advantages.detach() * log_probs).mean(Kind::Float);
    policy_loss - entropy_weight * entropys.mean(Kind::Float)
}

/// Compute PPO clipped policy loss
pub fn ppo_policy_loss(
    advantages: &Tensor,
    log_probs: &Tensor,
    old_log_probs: &Tensor,
    clip_coef: f64,
) -> Tensor {
    let advantages = advantages.detach();
    let ratio = (log_probs - old_log_probs.detach()).exp();

    let surr1 = &ratio * &advantages;
    let surr2 = ratio.clamp(1.0 - clip_coef, 1.0 + clip_coef) * &advantages;

    -surr1.min_other(&surr2).mean(Kind::Float)
}

/// Approximate KL divergence between old and new log probabilities
pub fn kl_divergence(log_probs: &Tensor, old_log_probs: &Tensor) -> Tensor {
    (old_log_probs - log_probs).mean(Kind::Float)
}
