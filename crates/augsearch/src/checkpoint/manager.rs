//! Checkpoint rotation and best-reward tracking.

use std::fs;
use std::path::{Path, PathBuf};

use super::state::Checkpointable;
use crate::Result;

const PREFIX: &str = "controller_step_";
const EXTENSION: &str = "json";
const BEST: &str = "controller_best.json";

/// Configuration for checkpoint management.
#[derive(Clone, Debug)]
pub struct CheckpointConfig {
    /// Directory to store checkpoints
    pub checkpoint_dir: PathBuf,
    /// Save every N controller updates
    pub save_every: u64,
    /// Keep only the last N checkpoints (0 = keep all)
    pub keep_last: usize,
    /// Also keep a copy of the highest-reward checkpoint
    pub save_best: bool,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            checkpoint_dir: PathBuf::from("checkpoints"),
            save_every: 10,
            keep_last: 5,
            save_best: true,
        }
    }
}

impl CheckpointConfig {
    /// Create a new config with the given directory.
    pub fn new(checkpoint_dir: impl Into<PathBuf>) -> Self {
        Self {
            checkpoint_dir: checkpoint_dir.into(),
            ..Default::default()
        }
    }

    /// Set save frequency.
    pub fn save_every(mut self, steps: u64) -> Self {
        self.save_every = steps.max(1);
        self
    }

    /// Set number of checkpoints to keep.
    pub fn keep_last(mut self, n: usize) -> Self {
        self.keep_last = n;
        self
    }

    /// Enable/disable best checkpoint tracking.
    pub fn save_best(mut self, enabled: bool) -> Self {
        self.save_best = enabled;
        self
    }
}

/// Manages the checkpoint directory of one search.
///
/// ```ignore
/// let mut manager = CheckpointManager::new(CheckpointConfig::new("./ckpt").save_every(20))?;
///
/// // after each controller update:
/// manager.maybe_save(&trainer, trainer.step(), stats.mean_reward)?;
///
/// // to resume:
/// if let Some(step) = manager.load_latest(&mut trainer)? {
///     tracing::info!(step, "Resumed");
/// }
/// ```
pub struct CheckpointManager {
    config: CheckpointConfig,
    best_reward: f64,
}

impl CheckpointManager {
    /// Create a manager, creating the checkpoint directory if needed.
    pub fn new(config: CheckpointConfig) -> Result<Self> {
        fs::create_dir_all(&config.checkpoint_dir)?;
        Ok(Self {
            config,
            best_reward: f64::NEG_INFINITY,
        })
    }

    pub fn checkpoint_dir(&self) -> &Path {
        &self.config.checkpoint_dir
    }

    /// Highest reward saved so far
    pub fn best_reward(&self) -> Option<f64> {
        self.best_reward.is_finite().then_some(self.best_reward)
    }

    /// Save when `step` is a positive multiple of `save_every`.
    ///
    /// Returns the path written, or `None` if this step is skipped.
    pub fn maybe_save<T: Checkpointable>(
        &mut self,
        trainable: &T,
        step: u64,
        reward: f64,
    ) -> Result<Option<PathBuf>> {
        if step == 0 || step % self.config.save_every != 0 {
            return Ok(None);
        }
        self.save(trainable, step, reward).map(Some)
    }

    /// Save unconditionally.
    pub fn save<T: Checkpointable>(
        &mut self,
        trainable: &T,
        step: u64,
        reward: f64,
    ) -> Result<PathBuf> {
        let data = trainable.save_state()?;

        let path = self
            .config
            .checkpoint_dir
            .join(format!("{}{:06}.{}", PREFIX, step, EXTENSION));
        fs::write(&path, &data)?;
        tracing::info!(path = %path.display(), step, "Saved checkpoint");

        if self.config.save_best && reward > self.best_reward {
            self.best_reward = reward;
            fs::copy(&path, self.config.checkpoint_dir.join(BEST))?;
            tracing::info!(reward, step, "New best checkpoint");
        }

        if self.config.keep_last > 0 {
            self.cleanup_old_checkpoints()?;
        }

        Ok(path)
    }

    /// Load the most recent checkpoint; returns its step.
    pub fn load_latest<T: Checkpointable>(&self, trainable: &mut T) -> Result<Option<u64>> {
        match self.list_checkpoints()?.pop() {
            Some(path) => {
                trainable.load_state(&fs::read(&path)?)?;
                let step = step_from_path(&path);
                tracing::info!(path = %path.display(), step, "Loaded checkpoint");
                Ok(Some(step))
            }
            None => Ok(None),
        }
    }

    /// Load the best checkpoint; returns false if none was saved.
    pub fn load_best<T: Checkpointable>(&self, trainable: &mut T) -> Result<bool> {
        let path = self.config.checkpoint_dir.join(BEST);
        if !path.exists() {
            return Ok(false);
        }
        trainable.load_state(&fs::read(&path)?)?;
        tracing::info!(path = %path.display(), "Loaded best checkpoint");
        Ok(true)
    }

    /// Load a specific checkpoint file.
    pub fn load_from_path<T: Checkpointable>(
        &self,
        trainable: &mut T,
        path: impl AsRef<Path>,
    ) -> Result<()> {
        trainable.load_state(&fs::read(path.as_ref())?)?;
        tracing::info!(path = %path.as_ref().display(), "Loaded checkpoint");
        Ok(())
    }

    /// Rotating checkpoints, oldest first.
    pub fn list_checkpoints(&self) -> Result<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.config.checkpoint_dir) {
            Ok(e) => e,
            Err(_) => return Ok(Vec::new()),
        };

        let mut checkpoints: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with(PREFIX) && n.ends_with(EXTENSION))
                    .unwrap_or(false)
            })
            .collect();

        checkpoints.sort();
        Ok(checkpoints)
    }

    fn cleanup_old_checkpoints(&self) -> Result<()> {
        let checkpoints = self.list_checkpoints()?;
        let excess = checkpoints.len().saturating_sub(self.config.keep_last);

        for old in &checkpoints[..excess] {
            if let Err(e) = fs::remove_file(old) {
                tracing::warn!(path = %old.display(), "Failed to remove old checkpoint: {}", e);
            } else {
                tracing::debug!(path = %old.display(), "Removed old checkpoint");
            }
        }
        Ok(())
    }
}

fn step_from_path(path: &Path) -> u64 {
    path.file_stem()
        .and_then(|s| s.to_str())
        .and_then(|s| s.strip_prefix(PREFIX))
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    struct MockTrainable {
        data: Vec<u8>,
    }

    impl Checkpointable for MockTrainable {
        fn save_state(&self) -> Result<Vec<u8>> {
            Ok(self.data.clone())
        }

        fn load_state(&mut self, data: &[u8]) -> Result<()> {
            self.data = data.to_vec();
            Ok(())
        }
    }

    #[test]
    fn test_checkpoint_config_builder() {
        let config = CheckpointConfig::new("./test")
            .save_every(50)
            .keep_last(10)
            .save_best(false);

        assert_eq!(config.checkpoint_dir, PathBuf::from("./test"));
        assert_eq!(config.save_every, 50);
        assert_eq!(config.keep_last, 10);
        assert!(!config.save_best);
        assert_eq!(CheckpointConfig::default().save_every(0).save_every, 1);
    }

    #[test]
    fn test_maybe_save_respects_frequency() {
        let dir = tempdir().unwrap();
        let mut manager = CheckpointManager::new(CheckpointConfig::new(dir.path()).save_every(5)).unwrap();
        let trainable = MockTrainable { data: vec![1, 2, 3] };

        assert!(manager.maybe_save(&trainable, 0, 0.0).unwrap().is_none());
        assert!(manager.maybe_save(&trainable, 3, 0.0).unwrap().is_none());
        assert!(manager.maybe_save(&trainable, 5, 0.0).unwrap().is_some());
        assert!(manager.maybe_save(&trainable, 10, 0.0).unwrap().is_some());
    }

    #[test]
    fn test_save_and_load_latest() {
        let dir = tempdir().unwrap();
        let mut manager = CheckpointManager::new(CheckpointConfig::new(dir.path())).unwrap();

        manager.save(&MockTrainable { data: vec![1] }, 3, 0.1).unwrap();
        manager.save(&MockTrainable { data: vec![1, 2, 3] }, 10, 0.2).unwrap();

        let mut loaded = MockTrainable { data: vec![] };
        assert_eq!(manager.load_latest(&mut loaded).unwrap(), Some(10));
        assert_eq!(loaded.data, vec![1, 2, 3]);
    }

    #[test]
    fn test_load_latest_empty_dir() {
        let dir = tempdir().unwrap();
        let manager = CheckpointManager::new(CheckpointConfig::new(dir.path())).unwrap();
        let mut loaded = MockTrainable { data: vec![7] };
        assert_eq!(manager.load_latest(&mut loaded).unwrap(), None);
        assert!(!manager.load_best(&mut loaded).unwrap());
        assert_eq!(loaded.data, vec![7]);
    }

    #[test]
    fn test_best_checkpoint_tracking() {
        let dir = tempdir().unwrap();
        let mut manager = CheckpointManager::new(CheckpointConfig::new(dir.path()).save_best(true)).unwrap();

        manager.save(&MockTrainable { data: vec![1] }, 1, 0.5).unwrap();
        manager.save(&MockTrainable { data: vec![2] }, 2, 0.9).unwrap();
        manager.save(&MockTrainable { data: vec![3] }, 3, 0.7).unwrap();

        assert_eq!(manager.best_reward(), Some(0.9));
        let mut loaded = MockTrainable { data: vec![] };
        assert!(manager.load_best(&mut loaded).unwrap());
        assert_eq!(loaded.data, vec![2]);
    }

    #[test]
    fn test_cleanup_old_checkpoints() {
        let dir = tempdir().unwrap();
        let config = CheckpointConfig::new(dir.path()).save_every(1).keep_last(2);
        let mut manager = CheckpointManager::new(config).unwrap();
        let trainable = MockTrainable { data: vec![1] };

        for step in 1..=5 {
            manager.save(&trainable, step, 0.0).unwrap();
        }

        let checkpoints = manager.list_checkpoints().unwrap();
        assert_eq!(checkpoints.len(), 2);
        assert!(checkpoints[0].to_string_lossy().contains("controller_step_000004"));
        assert!(checkpoints[1].to_string_lossy().contains("controller_step_000005"));
    }

    #[test]
    fn test_load_from_path() {
        let dir = tempdir().unwrap();
        let manager = CheckpointManager::new(CheckpointConfig::new(dir.path())).unwrap();

        let path = dir.path().join("custom.json");
        fs::write(&path, [9, 8, 7]).unwrap();

        let mut trainable = MockTrainable { data: vec![] };
        manager.load_from_path(&mut trainable, &path).unwrap();
        assert_eq!(trainable.data, vec![9, 8, 7]);
    }
}
