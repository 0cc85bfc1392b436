use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Number of distinct event ids, including padding and unknown.
    pub vocab_size: i64,
    /// Dimension of the event embeddings.
    pub embed_dim: i64,
    /// Hidden size of each GRU direction.
    pub hidden_size: i64,
    /// Number of stacked GRU layers.
    pub num_layers: i64,
    /// Width of the attention scoring projection.
    pub attention_dim: i64,
    /// Dropout probability applied to embeddings and the pooled sequence vector.
    pub dropout: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            vocab_size: 2,
            embed_dim: 100,
            hidden_size: 100,
            num_layers: 2,
            attention_dim: 100,
            dropout: 0.33,
        }
    }
}

impl ModelConfig {
    /// Width of the bidirectional GRU output.
    pub fn encoder_dim(&self) -> i64 {
        2 * self.hidden_size
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write model config to {:?}", path))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read model config at {:?}", path))?;
        serde_json::from_str(&content).context("Failed to parse model config")
    }
}
