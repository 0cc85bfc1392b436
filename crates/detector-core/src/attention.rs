use tch::{nn, Kind, Tensor};

use crate::config::ModelConfig;

/// Additive attention that pools a sequence of encoder states into one vector.
pub struct AttentionPool {
    proj: nn::Linear,
    context: Tensor,
}

impl AttentionPool {
    pub fn new(vs: &nn::Path, config: &ModelConfig) -> Self {
        let proj = nn::linear(
            vs / "proj",
            config.encoder_dim(),
            config.attention_dim,
            Default::default(),
        );
        let context = vs.var(
            "context",
            &[config.attention_dim],
            nn::Init::Uniform { lo: -0.1, up: 0.1 },
        );

        Self { proj, context }
    }

    /// hidden: [batch, seq_len, encoder_dim]
    /// mask: [batch, seq_len] bool, true on real (non-padding) positions.
    /// Returns: [batch, encoder_dim]
    pub fn forward(&self, hidden: &Tensor, mask: &Tensor) -> Tensor {
        let scores = hidden
            .apply(&self.proj)
            .tanh()
            .matmul(&self.context.unsqueeze(-1))
            .squeeze_dim(-1);

        let scores = scores.masked_fill(&mask.logical_not(), f64::NEG_INFINITY);
        let weights = scores.softmax(-1, Kind::Float);

        (hidden * weights.unsqueeze(-1)).sum_dim_intlist(Some(&[1][..]), false, Kind::Float)
    }
}
