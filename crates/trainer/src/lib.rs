pub mod dataset;
pub mod evaluate;
pub mod metrics;
pub mod optim;
pub mod selection;
pub mod train;

pub use evaluate::evaluate;
pub use metrics::{Confusion, Scores};
pub use optim::{Optimizer, StepDecay};
pub use train::{TrainReport, Trainer};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub learning_rate: f64,
    pub beta_1: f64,
    pub beta_2: f64,
    pub epsilon: f64,
    /// Multiplicative learning-rate decay factor.
    pub decay: f64,
    /// Number of optimizer steps between two decays.
    pub decay_steps: usize,
    pub train_batch_size: usize,
    pub test_batch_size: usize,
    /// Number of passes over the training split.
    pub train_iters: usize,
    /// Batches whose gradients are accumulated before one optimizer step.
    pub update_every: usize,
    /// Batches between two dev-set evaluations.
    pub validate_every: usize,
    /// Maximum global gradient norm.
    pub clip: f64,
    pub save_model_path: PathBuf,
    /// Anomaly probability at or above which an instance is flagged.
    pub threshold: f64,
    pub min_count: usize,
    pub seed: u64,
    pub use_cuda: bool,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            learning_rate: 2e-3,
            beta_1: 0.9,
            beta_2: 0.9,
            epsilon: 1e-12,
            decay: 0.75,
            decay_steps: 5000,
            train_batch_size: 100,
            test_batch_size: 1024,
            train_iters: 5,
            update_every: 1,
            validate_every: 100,
            clip: 5.0,
            save_model_path: PathBuf::from("checkpoints/model.safetensors"),
            threshold: 0.5,
            min_count: 1,
            seed: 42,
            use_cuda: true,
        }
    }
}

impl TrainerConfig {
    /// Loads a YAML config; missing keys take their default values.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read trainer config at {:?}", path))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse trainer config at {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.train_batch_size == 0 || self.test_batch_size == 0 {
            bail!("batch sizes must be positive");
        }
        if self.update_every == 0 {
            bail!("update_every must be positive");
        }
        if self.validate_every == 0 {
            bail!("validate_every must be positive");
        }
        if self.decay_steps == 0 {
            bail!("decay_steps must be positive");
        }
        if self.learning_rate <= 0.0 {
            bail!("learning_rate must be positive, got {}", self.learning_rate);
        }
        if self.clip <= 0.0 {
            bail!("clip must be positive, got {}", self.clip);
        }
        Ok(())
    }
}
