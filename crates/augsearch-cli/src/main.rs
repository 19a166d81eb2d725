//! augsearch CLI
//!
//! Command-line interface for sampling and training augmentation policies.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tch::{Device, Kind, Tensor};
use tracing_subscriber::EnvFilter;

use augsearch::augment::{augment_list, remove_duplicates, PolicyDecoder, SubPolicy};
use augsearch::prelude::*;

mod demo;

#[derive(Parser)]
#[command(name = "augsearch")]
#[command(version, about = "augsearch - Learned data augmentation policy search", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sample a batch of policies and print them as JSON
    Sample {
        /// Use the uniform random sampler instead of the controller
        #[arg(long)]
        random: bool,

        /// Number of policies
        #[arg(long, default_value = "4")]
        batch: i64,

        /// Search configuration (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Controller checkpoint to load
        #[arg(long)]
        checkpoint: Option<PathBuf>,

        /// Random seed
        #[arg(long)]
        seed: Option<u64>,

        /// Drop repeated sub-policies from each policy
        #[arg(long)]
        dedupe: bool,
    },

    /// Train the controller against a synthetic reward
    Demo {
        /// Number of controller updates
        #[arg(long, default_value = "50")]
        updates: u64,

        /// Policies per update
        #[arg(long, default_value = "16")]
        batch: i64,

        /// Operation the synthetic reward favours
        #[arg(long, default_value = "Rotate")]
        target_op: String,

        /// Learning rate (overrides the config file)
        #[arg(long)]
        lr: Option<f64>,

        /// Use the clipped PPO update with this many epochs
        #[arg(long)]
        ppo_epochs: Option<usize>,

        /// Search configuration (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Directory for rotating checkpoints
        #[arg(long)]
        checkpoint_dir: Option<PathBuf>,

        /// Save every N updates
        #[arg(long, default_value = "10")]
        save_every: u64,

        /// TensorBoard log directory
        #[cfg(feature = "tensorboard")]
        #[arg(long)]
        tensorboard: Option<PathBuf>,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// List the augmentation catalogue
    List,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Sample {
            random,
            batch,
            config,
            checkpoint,
            seed,
            dedupe,
        } => {
            sample(random, batch, config, checkpoint, seed, dedupe)?;
        }
        Commands::Demo {
            updates,
            batch,
            target_op,
            lr,
            ppo_epochs,
            config,
            checkpoint_dir,
            save_every,
            #[cfg(feature = "tensorboard")]
            tensorboard,
            seed,
        } => {
            let mut search = load_config(config.as_ref())?;
            search.trainer.seed = seed;
            if let Some(lr) = lr {
                search.trainer = search.trainer.with_lr(lr);
            }
            if let Some(epochs) = ppo_epochs {
                search.trainer = search.trainer.ppo(0.2, epochs);
            }

            let options = demo::DemoOptions {
                updates,
                batch,
                target_op,
                checkpoint_dir,
                save_every,
                #[cfg(feature = "tensorboard")]
                tensorboard,
            };
            demo::run(search, options, select_device())?;
        }
        Commands::List => {
            list_operations();
        }
    }

    Ok(())
}

fn select_device() -> Device {
    let device = Device::cuda_if_available();
    if device.is_cuda() {
        tracing::info!("Using CUDA");
    } else {
        tracing::info!("Using CPU");
    }
    device
}

fn load_config(path: Option<&PathBuf>) -> Result<SearchConfig> {
    match path {
        Some(path) => SearchConfig::from_json_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(SearchConfig::default()),
    }
}

/// Image batch matching the controller's expected input
pub(crate) fn synthetic_images(config: &ControllerConfig, batch: i64, device: Device) -> Tensor {
    let [c, h, w] = config.image_shape;
    Tensor::rand([batch, c, h, w], (Kind::Float, device))
}

#[derive(Serialize)]
struct SampledPolicy {
    index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    log_prob: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    entropy: Option<f64>,
    subpolicies: Vec<SubPolicy>,
}

fn sample(
    random: bool,
    batch: i64,
    config: Option<PathBuf>,
    checkpoint: Option<PathBuf>,
    seed: Option<u64>,
    dedupe: bool,
) -> Result<()> {
    anyhow::ensure!(batch > 0, "--batch must be positive, got {}", batch);

    let search = load_config(config.as_ref())?;
    if let Some(seed) = seed {
        augsearch::utils::set_seed(seed);
    }

    let device = Device::Cpu;
    let images = synthetic_images(&search.controller, batch, device);

    let sample = if random {
        let mut sampler = RandomSampler::from_config(&search.controller);
        if let Some(seed) = seed {
            sampler = sampler.with_seed(seed);
        }
        sampler.sample(Some(&images))?
    } else {
        let controller = Controller::new(search.controller.clone(), device)?;
        let mut trainer = ControllerTrainer::new(controller, search.trainer.clone())?;
        if let Some(path) = &checkpoint {
            let data = fs::read(path)
                .with_context(|| format!("failed to read checkpoint {}", path.display()))?;
            trainer.load_state(&data)?;
        }
        trainer.controller_mut().set_train(false);
        tch::no_grad(|| trainer.sample(Some(&images)))?
    };

    let decoder = PolicyDecoder::new(search.controller.operation_space())?;
    let scalars = |t: &Option<Tensor>| -> Result<Option<Vec<f64>>> {
        t.as_ref()
            .map(|t| Vec::<f64>::try_from(t.detach().to_kind(Kind::Double)))
            .transpose()
            .map_err(Into::into)
    };
    let log_probs = scalars(&sample.log_probs)?;
    let entropys = scalars(&sample.entropys)?;

    let policies = decoder
        .decode_all(&sample.policies)?
        .into_iter()
        .enumerate()
        .map(|(index, subpolicies)| SampledPolicy {
            index,
            log_prob: log_probs.as_ref().map(|v| v[index]),
            entropy: entropys.as_ref().map(|v| v[index]),
            subpolicies: if dedupe {
                remove_duplicates(subpolicies)
            } else {
                subpolicies
            },
        })
        .collect::<Vec<_>>();

    println!("{}", serde_json::to_string_pretty(&policies)?);
    Ok(())
}

fn list_operations() {
    println!("Available operations:");
    for (index, aug) in augment_list().iter().enumerate() {
        println!("  {:>2}  {:<13} [{}, {}]", index, aug.name, aug.min, aug.max);
    }
}
