//! TensorBoard logging backend.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tensorboard_rs::summary_writer::SummaryWriter;

use super::MetricLogger;
use crate::Result;

/// Writes scalars to TensorBoard event files under one run directory.
pub struct TensorBoardLogger {
    run_dir: PathBuf,
    writer: Mutex<SummaryWriter>,
}

impl TensorBoardLogger {
    /// Create the run directory and an event writer inside it
    pub fn new(run_dir: impl AsRef<Path>) -> Result<Self> {
        let run_dir = run_dir.as_ref().to_path_buf();
        fs::create_dir_all(&run_dir)?;
        tracing::info!(dir = %run_dir.display(), "Writing TensorBoard events");
        Ok(Self {
            writer: Mutex::new(SummaryWriter::new(&run_dir)),
            run_dir,
        })
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    fn write(&self, scalars: &[(&str, f64)], step: u64) {
        match self.writer.lock() {
            Ok(mut writer) => {
                for (name, value) in scalars {
                    writer.add_scalar(name, *value as f32, step as usize);
                }
                let _ = writer.flush();
            }
            Err(_) => tracing::warn!("TensorBoard writer lock poisoned, dropping step {}", step),
        }
    }
}

impl MetricLogger for TensorBoardLogger {
    fn log_scalar(&self, name: &str, value: f64, step: u64) {
        self.write(&[(name, value)], step);
    }

    fn log_metrics(&self, metrics: &HashMap<String, f64>, step: u64) {
        let mut scalars: Vec<(&str, f64)> = metrics.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        scalars.sort_by(|a, b| a.0.cmp(b.0));
        self.write(&scalars, step);
    }

    fn close(&self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}
