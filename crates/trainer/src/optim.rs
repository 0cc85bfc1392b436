use anyhow::Result;
use tch::{nn, nn::OptimizerConfig};

use crate::TrainerConfig;

/// Step decay: `lr(epoch) = base_lr * decay^(epoch / decay_steps)`.
///
/// One schedule "epoch" is one optimizer step.
#[derive(Debug, Clone)]
pub struct StepDecay {
    base_lr: f64,
    decay: f64,
    decay_steps: usize,
    epoch: usize,
}

impl StepDecay {
    pub fn new(base_lr: f64, decay: f64, decay_steps: usize) -> Self {
        Self {
            base_lr,
            decay,
            decay_steps: decay_steps.max(1),
            epoch: 0,
        }
    }

    pub fn lr_at(&self, epoch: usize) -> f64 {
        self.base_lr * self.decay.powi((epoch / self.decay_steps) as i32)
    }

    pub fn current(&self) -> f64 {
        self.lr_at(self.epoch)
    }

    pub fn epoch(&self) -> usize {
        self.epoch
    }

    pub fn step(&mut self) {
        self.epoch += 1;
    }
}

/// Adam over the trainable variables of a store, driven by a `StepDecay`.
pub struct Optimizer {
    optim: nn::Optimizer,
    scheduler: StepDecay,
}

impl Optimizer {
    pub fn new(vs: &nn::VarStore, config: &TrainerConfig) -> Result<Self> {
        let optim = nn::Adam {
            beta1: config.beta_1,
            beta2: config.beta_2,
            wd: 0.0,
            eps: config.epsilon,
            amsgrad: false,
        }
        .build(vs, config.learning_rate)?;

        Ok(Self {
            optim,
            scheduler: StepDecay::new(config.learning_rate, config.decay, config.decay_steps),
        })
    }

    /// Applies the accumulated gradients, advances the schedule and clears
    /// the gradients.
    pub fn step(&mut self) {
        self.optim.step();
        self.schedule();
        self.optim.zero_grad();
    }

    fn schedule(&mut self) {
        self.scheduler.step();
        self.optim.set_lr(self.scheduler.current());
    }

    pub fn zero_grad(&mut self) {
        self.optim.zero_grad();
    }

    pub fn clip_grad_norm(&mut self, max_norm: f64) {
        self.optim.clip_grad_norm(max_norm);
    }

    pub fn lr(&self) -> f64 {
        self.scheduler.current()
    }

    pub fn steps(&self) -> usize {
        self.scheduler.epoch()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tch::{Device, Kind, Tensor};

    #[test]
    fn decay_applies_every_decay_steps() {
        let schedule = StepDecay::new(0.002, 0.75, 3);
        for epoch in 0..20 {
            let expected = 0.002 * 0.75f64.powi((epoch / 3) as i32);
            assert_relative_eq!(schedule.lr_at(epoch), expected);
        }
        assert_relative_eq!(schedule.lr_at(2), 0.002);
        assert_relative_eq!(schedule.lr_at(3), 0.0015);
    }

    #[test]
    fn current_follows_steps() {
        let mut schedule = StepDecay::new(1.0, 0.5, 2);
        let mut seen = Vec::new();
        for _ in 0..5 {
            seen.push(schedule.current());
            schedule.step();
        }
        assert_eq!(seen, vec![1.0, 1.0, 0.5, 0.5, 0.25]);
    }

    fn config() -> TrainerConfig {
        TrainerConfig {
            learning_rate: 0.1,
            decay: 0.5,
            decay_steps: 2,
            ..Default::default()
        }
    }

    fn grad_sum(t: &Tensor) -> f64 {
        t.grad().abs().sum(Kind::Float).double_value(&[])
    }

    #[test]
    fn step_updates_parameters_and_clears_gradients() {
        let vs = nn::VarStore::new(Device::Cpu);
        let w = vs.root().var("w", &[3], nn::Init::Const(1.0));
        let mut optimizer = Optimizer::new(&vs, &config()).unwrap();

        let loss = (&w * 2.0).sum(Kind::Float);
        loss.backward();
        assert!(grad_sum(&w) > 0.0);

        optimizer.step();
        assert!(w.double_value(&[0]) < 1.0);
        assert_eq!(grad_sum(&w), 0.0);
        assert_eq!(optimizer.steps(), 1);
    }

    #[test]
    fn lr_decays_with_optimizer_steps() {
        let vs = nn::VarStore::new(Device::Cpu);
        let w = vs.root().var("w", &[1], nn::Init::Const(0.0));
        let mut optimizer = Optimizer::new(&vs, &config()).unwrap();

        let mut lrs = vec![optimizer.lr()];
        for _ in 0..4 {
            (&w * 1.0).sum(Kind::Float).backward();
            optimizer.step();
            lrs.push(optimizer.lr());
        }
        assert_eq!(lrs, vec![0.1, 0.1, 0.05, 0.05, 0.025]);
    }
}
