//! Controller training against a synthetic reward.
//!
//! Each sampled policy is rewarded with the fraction of its operations equal
//! to a target operation, standing in for the classifier affinity/diversity
//! measurement of a real search.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tch::Device;

use augsearch::augment::find_augmentation;
use augsearch::log::{CompositeLogger, ConsoleLogger, MetricLogger};
use augsearch::prelude::*;
use augsearch::utils::{format_duration, set_seed};

pub struct DemoOptions {
    pub updates: u64,
    pub batch: i64,
    pub target_op: String,
    pub checkpoint_dir: Option<PathBuf>,
    pub save_every: u64,
    #[cfg(feature = "tensorboard")]
    pub tensorboard: Option<PathBuf>,
}

/// Fraction of each policy's operations whose type is `target`
fn target_fraction(policies: &PolicyBatch, target: usize) -> Vec<f64> {
    let per_policy = (policies.n_subpolicy() * policies.n_op()) as f64;
    (0..policies.batch_size())
        .map(|b| {
            let policy = policies.policy(b);
            let hits = policy
                .outer_iter()
                .flat_map(|sub| sub.outer_iter().map(|op| op[0]).collect::<Vec<_>>())
                .filter(|&t| t == target)
                .count();
            hits as f64 / per_policy
        })
        .collect()
}

fn build_logger(options: &DemoOptions) -> Result<Box<dyn MetricLogger>> {
    let mut logger = CompositeLogger::default();
    if options.updates <= 100 {
        logger.add(Box::new(ConsoleLogger::new()));
    }
    #[cfg(feature = "tensorboard")]
    if let Some(dir) = &options.tensorboard {
        logger.add(Box::new(TensorBoardLogger::new(dir)?));
    }
    Ok(Box::new(logger))
}

pub fn run(search: SearchConfig, options: DemoOptions, device: Device) -> Result<()> {
    anyhow::ensure!(options.batch > 0, "--batch must be positive");

    let (target, aug) = find_augmentation(&options.target_op)
        .with_context(|| format!("unknown operation '{}'", options.target_op))?;
    anyhow::ensure!(
        target < search.controller.operation_types,
        "operation '{}' is outside the configured {} operation types",
        aug.name,
        search.controller.operation_types
    );

    set_seed(search.trainer.seed);
    tracing::info!(
        target = aug.name,
        updates = options.updates,
        batch = options.batch,
        rule = ?search.trainer.update_rule,
        "Starting demo search"
    );

    let controller = Controller::new(search.controller.clone(), device)?;
    let mut trainer = ControllerTrainer::new(controller, search.trainer.clone())?
        .with_logger(build_logger(&options)?);

    let mut manager = match &options.checkpoint_dir {
        Some(dir) => {
            let manager = CheckpointManager::new(
                CheckpointConfig::new(dir).save_every(options.save_every),
            )?;
            if let Some(step) = manager.load_latest(&mut trainer)? {
                tracing::info!(step, "Resuming from checkpoint");
            }
            Some(manager)
        }
        None => None,
    };

    let images = crate::synthetic_images(&search.controller, options.batch, device);
    let initial = trainer.step();
    let progress = ProgressBar::new(options.updates);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let start = Instant::now();
    let mut first_reward = None;
    let mut last_reward = 0.0;

    for _ in 0..options.updates {
        let sample = trainer.sample(Some(&images))?;
        let rewards = target_fraction(&sample.policies, target);
        let stats = trainer.update(&sample, Some(&images), &rewards)?;

        first_reward.get_or_insert(stats.mean_reward);
        last_reward = stats.mean_reward;

        if let Some(manager) = manager.as_mut() {
            manager.maybe_save(&trainer, stats.step, stats.mean_reward)?;
        }

        progress.set_message(format!(
            "reward={:.3} baseline={:.3}",
            stats.mean_reward, stats.baseline
        ));
        progress.inc(1);
    }
    progress.finish_and_clear();

    if let Some(manager) = manager.as_mut() {
        if trainer.step() > initial && trainer.step() % options.save_every.max(1) != 0 {
            manager.save(&trainer, trainer.step(), last_reward)?;
        }
    }

    tracing::info!(
        steps = trainer.step(),
        elapsed = %format_duration(start.elapsed().as_secs_f64()),
        "Demo finished"
    );
    println!(
        "Target {} reward: {:.3} -> {:.3} after {} updates",
        aug.name,
        first_reward.unwrap_or(0.0),
        last_reward,
        trainer.step()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array4;

    #[test]
    fn test_target_fraction() {
        let mut array = Array4::zeros((2, 2, 2, 3));
        array[[0, 0, 0, 0]] = 4;
        array[[0, 1, 1, 0]] = 4;
        array[[1, 0, 0, 0]] = 4;
        let policies = PolicyBatch::new(array);

        assert_eq!(target_fraction(&policies, 4), vec![0.5, 0.25]);
        assert_eq!(target_fraction(&policies, 0), vec![0.5, 0.75]);
    }
}
