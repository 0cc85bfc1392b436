use anyhow::{Context, Result};
use tch::nn::RNN;
use tch::{nn, Device, Kind, Reduction, Tensor};

use crate::attention::AttentionPool;
use crate::classifier::{Classifier, Mode};
use crate::config::ModelConfig;

const PAD_ID: i64 = 0;

/// Bidirectional GRU encoder with attention pooling and a two-way head.
pub struct AttGru {
    vs: nn::VarStore,
    embed: nn::Embedding,
    gru: nn::GRU,
    attention: AttentionPool,
    head: nn::Linear,
    pub config: ModelConfig,
}

impl AttGru {
    pub fn new(config: &ModelConfig, device: Device) -> Self {
        let vs = nn::VarStore::new(device);
        let root = vs.root();

        let embed = nn::embedding(
            &root / "embed",
            config.vocab_size,
            config.embed_dim,
            nn::EmbeddingConfig {
                padding_idx: PAD_ID,
                ..Default::default()
            },
        );
        let gru = nn::gru(
            &root / "gru",
            config.embed_dim,
            config.hidden_size,
            nn::RNNConfig {
                num_layers: config.num_layers,
                bidirectional: true,
                batch_first: true,
                ..Default::default()
            },
        );
        let attention = AttentionPool::new(&(&root / "attention"), config);
        let head = nn::linear(&root / "head", config.encoder_dim(), 2, Default::default());

        Self {
            vs,
            embed,
            gru,
            attention,
            head,
            config: config.clone(),
        }
    }

    pub fn var_store_mut(&mut self) -> &mut nn::VarStore {
        &mut self.vs
    }
}

impl Classifier for AttGru {
    fn var_store(&self) -> &nn::VarStore {
        &self.vs
    }

    fn forward_t(&self, inputs: &Tensor, mode: Mode) -> Tensor {
        let train = mode.is_train();
        let mask = inputs.ne(PAD_ID);

        let x = inputs.apply(&self.embed).dropout(self.config.dropout, train);
        let (hidden, _) = self.gru.seq(&x);
        let pooled = self.attention.forward(&hidden, &mask);

        pooled.dropout(self.config.dropout, train).apply(&self.head)
    }

    fn compute_loss(&self, logits: &Tensor, targets: &Tensor) -> Tensor {
        logits.binary_cross_entropy_with_logits::<Tensor>(targets, None, None, Reduction::Mean)
    }

    fn compute_accuracy(&self, logits: &Tensor, truth: &Tensor) -> (i64, i64) {
        let predicted = logits.argmax(-1, false);
        let correct = predicted
            .eq_tensor(&truth.to_device(predicted.device()))
            .sum(Kind::Int64)
            .int64_value(&[]);
        (correct, truth.size()[0])
    }

    fn classify(&self, inputs: &Tensor, threshold: f64) -> Result<(Vec<i64>, Vec<f64>)> {
        let _guard = tch::no_grad_guard();

        let logits = self.forward_t(inputs, Mode::Eval);
        let scores = logits
            .softmax(-1, Kind::Double)
            .select(1, 1)
            .contiguous()
            .to_device(Device::Cpu);
        let scores = Vec::<f64>::try_from(&scores)?;

        let tags = scores
            .iter()
            .map(|&p| if p >= threshold { 1 } else { 0 })
            .collect();
        Ok((tags, scores))
    }

    fn snapshot(&self) -> Result<Self> {
        let mut copy = AttGru::new(&self.config, self.vs.device());
        copy.vs
            .copy(&self.vs)
            .context("Failed to copy model parameters")?;
        Ok(copy)
    }
}
