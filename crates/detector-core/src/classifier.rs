use anyhow::Result;
use tch::{nn, Device, Tensor};

/// Execution mode for a forward pass. Dropout is only active in `Train`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Train,
    Eval,
}

impl Mode {
    pub fn is_train(self) -> bool {
        matches!(self, Mode::Train)
    }
}

/// A binary sequence classifier over padded event-id batches.
///
/// Logits have shape `[batch, 2]`; column 0 is normal, column 1 anomalous.
pub trait Classifier {
    fn var_store(&self) -> &nn::VarStore;

    fn device(&self) -> Device {
        self.var_store().device()
    }

    /// inputs: `[batch, seq_len]` int64 event ids, 0 = padding.
    fn forward_t(&self, inputs: &Tensor, mode: Mode) -> Tensor;

    /// targets: `[batch, 2]` float probabilities.
    fn compute_loss(&self, logits: &Tensor, targets: &Tensor) -> Tensor;

    /// Returns (correct, total) against `[batch]` int64 tag ids.
    fn compute_accuracy(&self, logits: &Tensor, truth: &Tensor) -> (i64, i64);

    /// Returns predicted tag ids and the anomaly probability of every row.
    /// A row is anomalous when its probability reaches `threshold`.
    fn classify(&self, inputs: &Tensor, threshold: f64) -> Result<(Vec<i64>, Vec<f64>)>;

    /// An independent copy of the current parameters.
    fn snapshot(&self) -> Result<Self>
    where
        Self: Sized;
}
