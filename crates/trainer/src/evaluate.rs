use anyhow::{Context, Result};
use log::info;
use rand::rngs::StdRng;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use detector_core::Classifier;
use logdata::{data_iter, write_instance, Instance, Vocab};

use crate::dataset::{reconcile, Batch};
use crate::metrics::{Confusion, Scores};
use crate::TrainerConfig;

/// Runs the classifier over `data` without gradient tracking and returns
/// precision, recall and F1. When `output` is given every annotated instance
/// is written to it as one JSON line.
pub fn evaluate<M: Classifier>(
    data: &[Instance],
    classifier: &M,
    vocab: &Vocab,
    config: &TrainerConfig,
    output: Option<&Path>,
    threshold: f64,
) -> Result<Scores> {
    let _guard = tch::no_grad_guard();
    let start = Instant::now();

    let mut writer = match output {
        Some(path) => Some(BufWriter::new(File::create(path).with_context(|| {
            format!("Failed to create prediction file {:?}", path)
        })?)),
        None => None,
    };

    let device = classifier.device();
    let mut confusion = Confusion::default();
    for onebatch in data_iter(data, config.test_batch_size, None::<&mut StdRng>) {
        let batch = Batch::from_instances(&onebatch, vocab).to_device(device);
        let (pred_tags, tag_scores) = classifier.classify(&batch.inputs, threshold)?;

        for (inst, matched) in reconcile(&onebatch, &pred_tags, &tag_scores, vocab) {
            if let Some(w) = writer.as_mut() {
                write_instance(w, &inst)?;
            }
            confusion.record(matched, inst.is_normal());
        }
    }

    if let Some(mut w) = writer {
        w.flush()?;
    }

    let Confusion { tp, tn, fp, fn_ } = confusion;
    info!("TP: {}, TN: {}, FN: {}, FP: {}", tp, tn, fn_, fp);

    if confusion.is_degenerate() {
        info!("Precision is 0 and therefore f is 0");
        return Ok(Scores::default());
    }

    let scores = confusion.scores();
    info!(
        "Precision = {} / {} = {:.4}, Recall = {} / {} = {:.4}, F1 score = {:.4}",
        tp,
        tp + fp,
        scores.precision,
        tp,
        tp + fn_,
        scores.recall,
        scores.f1
    );
    info!(
        "TPR = {} / {} = {:.4}, FPR = {} / {} = {:.4}, time = {:.2}",
        tp,
        tp + fn_,
        confusion.tpr(),
        fp,
        fp + tn,
        confusion.fpr(),
        start.elapsed().as_secs_f64()
    );
    Ok(scores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use detector_core::{AttGru, ModelConfig};
    use logdata::{read_jsonl, Label};
    use tch::Device;

    fn dataset() -> Vec<Instance> {
        (0..10)
            .map(|i| {
                let kind = if i < 4 { "Anomalous" } else { "Normal" };
                let events = (0..(i % 3 + 1)).map(|e| format!("E{}", e + i % 2)).collect();
                Instance::new(format!("blk_{}", i), events, kind)
            })
            .collect()
    }

    fn setup() -> (AttGru, Vocab, TrainerConfig) {
        tch::manual_seed(5);
        let vocab = Vocab::build(&dataset(), 1);
        let model_config = ModelConfig {
            vocab_size: vocab.len() as i64,
            embed_dim: 4,
            hidden_size: 3,
            num_layers: 1,
            attention_dim: 4,
            dropout: 0.0,
        };
        let config = TrainerConfig {
            test_batch_size: 3,
            use_cuda: false,
            ..Default::default()
        };
        (AttGru::new(&model_config, Device::Cpu), vocab, config)
    }

    #[test]
    fn flagging_everything_scores_by_class_balance() {
        let (model, vocab, config) = setup();
        let scores = evaluate(&dataset(), &model, &vocab, &config, None, 0.0).unwrap();
        assert_relative_eq!(scores.precision, 40.0);
        assert_relative_eq!(scores.recall, 100.0);
        assert_relative_eq!(scores.f1, 2.0 * 40.0 * 100.0 / 140.0, epsilon = 1e-9);
    }

    #[test]
    fn flagging_nothing_scores_zero() {
        let (model, vocab, config) = setup();
        let scores = evaluate(&dataset(), &model, &vocab, &config, None, 1.1).unwrap();
        assert_eq!(scores, Scores::default());
    }

    #[test]
    fn predictions_are_written_for_every_instance() {
        let (model, vocab, config) = setup();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("predictions.jsonl");

        evaluate(&dataset(), &model, &vocab, &config, Some(&path), 1.1).unwrap();

        let written = read_jsonl(&path).unwrap();
        assert_eq!(written.len(), 10);
        assert!(written.iter().all(|i| i.predicted == Some(Label::Normal)));
        assert!(written.iter().all(|i| i.score.is_some()));
        assert_eq!(written[3].id, "blk_3");
    }

    #[test]
    fn empty_split_scores_zero() {
        let (model, vocab, config) = setup();
        let scores = evaluate(&[], &model, &vocab, &config, None, 0.5).unwrap();
        assert_eq!(scores, Scores::default());
    }
}
