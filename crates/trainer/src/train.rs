use anyhow::Result;
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;
use std::time::Instant;

use detector_core::safetensors_util::save_safetensors;
use detector_core::{Classifier, Mode};
use logdata::{batch_count, data_iter, Instance, Vocab};

use crate::dataset::Batch;
use crate::evaluate::evaluate;
use crate::metrics::Scores;
use crate::optim::Optimizer;
use crate::selection::Selection;
use crate::TrainerConfig;

/// True on every `every`-th batch (1-indexed) and on the last batch.
pub fn at_boundary(batch_iter: usize, every: usize, batch_num: usize) -> bool {
    batch_iter % every.max(1) == 0 || batch_iter == batch_num
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainReport {
    /// Test-set scores of the dev-selected model; all zero when no model was selected.
    pub dev: Scores,
    /// Test-set scores of the model after the last iteration.
    pub last: Scores,
    /// Dev F1 of the selected model, if any.
    pub best_f1: Option<f64>,
    pub global_step: usize,
    /// Number of times the dev split was scored.
    pub dev_evaluations: usize,
}

impl TrainReport {
    pub fn as_tuple(&self) -> (f64, f64, f64, f64, f64, f64) {
        (
            self.dev.precision,
            self.dev.recall,
            self.dev.f1,
            self.last.precision,
            self.last.recall,
            self.last.f1,
        )
    }
}

pub struct Trainer<M: Classifier> {
    config: TrainerConfig,
    model: M,
    vocab: Vocab,
    optimizer: Optimizer,
    rng: StdRng,
    global_step: usize,
}

impl<M: Classifier> Trainer<M> {
    pub fn new(model: M, vocab: Vocab, config: TrainerConfig) -> Result<Self> {
        config.validate()?;
        let optimizer = Optimizer::new(model.var_store(), &config)?;
        let rng = StdRng::seed_from_u64(config.seed);

        Ok(Self {
            config,
            model,
            vocab,
            optimizer,
            rng,
            global_step: 0,
        })
    }

    pub fn vocab(&self) -> &Vocab {
        &self.vocab
    }

    pub fn lr(&self) -> f64 {
        self.optimizer.lr()
    }

    /// Trains on `data`, selecting the best model on `dev`, then scores both
    /// the final and the selected model on `test`. The selected model (or the
    /// final one when nothing was selected) is saved to `save_model_path`.
    pub fn train(
        &mut self,
        data: &[Instance],
        dev: Option<&[Instance]>,
        test: &[Instance],
        output: Option<&Path>,
    ) -> Result<TrainReport> {
        let config = self.config.clone();
        let device = self.model.device();
        let batch_num = batch_count(data.len(), config.train_batch_size);
        let mut selection = Selection::new();
        let mut dev_evaluations = 0;
        let train_start = Instant::now();

        info!("Starting training with configuration: {:?}", config);

        for iter in 0..config.train_iters {
            let start_time = Instant::now();
            info!("Iteration: {}, total batch num: {}", iter, batch_num);

            let (mut correct_num, mut total_num) = (0i64, 0i64);
            let batches = data_iter(data, config.train_batch_size, Some(&mut self.rng));

            for (batch_iter, onebatch) in batches.iter().enumerate() {
                let batch = Batch::from_instances(onebatch, &self.vocab).to_device(device);

                let logits = self.model.forward_t(&batch.inputs, Mode::Train);
                let loss = self.model.compute_loss(&logits, &batch.targets)
                    / config.update_every as f64;
                let loss_value = loss.double_value(&[]);
                loss.backward();

                let (cur_correct, cur_count) = self.model.compute_accuracy(&logits, &batch.truth);
                correct_num += cur_correct;
                total_num += cur_count;
                let acc = correct_num as f64 * 100.0 / total_num.max(1) as f64;

                if batch_iter % 100 == 0 {
                    info!(
                        "Step:{}, ACC:{:.2}, Iter:{}, batch:{}, time:{:.2}, loss:{:.2}",
                        self.global_step,
                        acc,
                        iter,
                        batch_iter,
                        start_time.elapsed().as_secs_f64(),
                        loss_value
                    );
                }

                let batch_iter = batch_iter + 1;
                if at_boundary(batch_iter, config.update_every, batch_num) {
                    self.optimizer.clip_grad_norm(config.clip);
                    self.optimizer.step();
                    self.optimizer.zero_grad();
                    self.global_step += 1;
                }

                if let Some(dev) = dev {
                    if at_boundary(batch_iter, config.validate_every, batch_num) {
                        info!("Testing on dev set.");
                        let (model, vocab) = (&self.model, &self.vocab);
                        let scores = evaluate(dev, model, vocab, &config, None, config.threshold)?;
                        dev_evaluations += 1;
                        let history = selection.best_f1();
                        if selection.consider(scores.f1, || self.model.snapshot())? {
                            info!(
                                "Exceed best f: history = {:.2}, current = {:.2}",
                                history, scores.f1
                            );
                        }
                    }
                }
            }

            info!(
                "Training iter {} finished in {:.2}.",
                iter,
                start_time.elapsed().as_secs_f64()
            );
        }

        info!(
            "Training process finished in {:.2}, start testing final model on testing set.",
            train_start.elapsed().as_secs_f64()
        );
        let last = evaluate(test, &self.model, &self.vocab, &config, None, config.threshold)?;

        let (dev_scores, best_f1) = match selection.into_best() {
            Some(best) => {
                info!("Train finished, start testing based on the best model chosen by dev set.");
                save_safetensors(best.model.var_store(), &config.save_model_path)?;
                let scores =
                    evaluate(test, &best.model, &self.vocab, &config, output, config.threshold)?;
                (scores, Some(best.f1))
            }
            None => {
                info!(
                    "No classifier generated during training process due to dev performance \
                     or no dev is given. Testing on testing set using model trained till \
                     final epoch"
                );
                save_safetensors(self.model.var_store(), &config.save_model_path)?;
                (Scores::default(), None)
            }
        };
        info!("Saved model parameters to {:?}", config.save_model_path);

        Ok(TrainReport {
            dev: dev_scores,
            last,
            best_f1,
            global_step: self.global_step,
            dev_evaluations,
        })
    }
}
