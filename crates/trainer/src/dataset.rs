use tch::{Device, Kind, Tensor};

use logdata::vocab::PAD_ID;
use logdata::{Instance, Vocab};

/// Tensors for one batch of instances.
pub struct Batch {
    /// [batch, max_len] int64 event ids, right-padded with `PAD_ID`.
    pub inputs: Tensor,
    /// [batch, 2] float soft targets built from tag and confidence.
    pub targets: Tensor,
    /// [batch] int64 training tag ids.
    pub truth: Tensor,
}

impl Batch {
    pub fn from_instances(batch: &[&Instance], vocab: &Vocab) -> Self {
        let encoded: Vec<Vec<i64>> = batch.iter().map(|inst| vocab.encode(&inst.events)).collect();
        let max_len = encoded.iter().map(Vec::len).max().unwrap_or(1).max(1);
        let size = batch.len() as i64;

        let mut inputs = Vec::with_capacity(batch.len() * max_len);
        for ids in &encoded {
            inputs.extend_from_slice(ids);
            inputs.extend(std::iter::repeat(PAD_ID).take(max_len - ids.len()));
        }

        let mut targets = Vec::with_capacity(batch.len() * 2);
        let mut truth = Vec::with_capacity(batch.len());
        for inst in batch {
            let tag = vocab.tag_id(inst.tag());
            let confidence = inst.confidence() as f32;
            if tag == 0 {
                targets.extend_from_slice(&[confidence, 1.0 - confidence]);
            } else {
                targets.extend_from_slice(&[1.0 - confidence, confidence]);
            }
            truth.push(tag);
        }

        Self {
            inputs: Tensor::from_slice(&inputs).view([size, max_len as i64]),
            targets: Tensor::from_slice(&targets).view([size, 2]).to_kind(Kind::Float),
            truth: Tensor::from_slice(&truth),
        }
    }

    pub fn to_device(self, device: Device) -> Self {
        Self {
            inputs: self.inputs.to(device),
            targets: self.targets.to(device),
            truth: self.truth.to(device),
        }
    }
}

/// Pairs each source instance with its prediction. Yields the annotated
/// instance and whether the prediction agrees with the ground-truth type.
pub fn reconcile<'a>(
    batch: &'a [&'a Instance],
    predicted: &'a [i64],
    scores: &'a [f64],
    vocab: &'a Vocab,
) -> impl Iterator<Item = (Instance, bool)> + 'a {
    batch
        .iter()
        .zip(predicted.iter().zip(scores.iter()))
        .map(move |(inst, (&tag_id, &score))| {
            let label = vocab.id_to_tag(tag_id);
            (inst.with_prediction(label, score), label == inst.truth())
        })
}
