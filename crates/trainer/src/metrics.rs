use serde::{Deserialize, Serialize};

/// Precision, recall and F1, all as percentages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl Scores {
    pub fn as_tuple(&self) -> (f64, f64, f64) {
        (self.precision, self.recall, self.f1)
    }
}

/// 2x2 confusion counts with "Normal" as the negative class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Confusion {
    pub tp: u64,
    pub tn: u64,
    pub fp: u64,
    pub fn_: u64,
}

fn percent(num: u64, den: u64) -> f64 {
    if den == 0 {
        0.0
    } else {
        100.0 * num as f64 / den as f64
    }
}

impl Confusion {
    pub fn new(tp: u64, tn: u64, fp: u64, fn_: u64) -> Self {
        Self { tp, tn, fp, fn_ }
    }

    pub fn record(&mut self, matched: bool, is_normal: bool) {
        match (matched, is_normal) {
            (true, false) => self.tp += 1,
            (true, true) => self.tn += 1,
            (false, true) => self.fp += 1,
            (false, false) => self.fn_ += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.tp + self.tn + self.fp + self.fn_
    }

    /// Nothing was flagged anomalous, so precision is undefined.
    pub fn is_degenerate(&self) -> bool {
        self.tp + self.fp == 0
    }

    /// All-zero when nothing was flagged; otherwise zero denominators yield 0.
    pub fn scores(&self) -> Scores {
        if self.is_degenerate() {
            return Scores::default();
        }
        let precision = percent(self.tp, self.tp + self.fp);
        let recall = percent(self.tp, self.tp + self.fn_);
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };
        Scores { precision, recall, f1 }
    }

    pub fn tpr(&self) -> f64 {
        percent(self.tp, self.tp + self.fn_)
    }

    pub fn fpr(&self) -> f64 {
        percent(self.fp, self.fp + self.tn)
    }
}
