//! Running metric accumulators.
//!
//! Accumulators follow an update / result / reset lifecycle: values are
//! accumulated over a phase's batches, read out at phase end, and reset
//! before the state is reused. After `reset()` (or before any update)
//! `result()` returns zero.

use ndarray::ArrayView2;

/// Running arithmetic mean of scalar values.
#[derive(Debug, Clone, Default)]
pub struct Mean {
    sum: f32,
    count: usize,
}

impl Mean {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, value: f32) {
        self.sum += value;
        self.count += 1;
    }

    pub fn result(&self) -> f32 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f32
        }
    }

    pub fn reset(&mut self) {
        self.sum = 0.0;
        self.count = 0;
    }
}

/// Running categorical accuracy over (one-hot target, probability) rows.
///
/// A row counts as correct when the argmax of the predicted distribution
/// matches the argmax of the target.
#[derive(Debug, Clone, Default)]
pub struct CategoricalAccuracy {
    correct: usize,
    total: usize,
}

impl CategoricalAccuracy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, targets: ArrayView2<f32>, predictions: ArrayView2<f32>) {
        for (target_row, pred_row) in targets.rows().into_iter().zip(predictions.rows()) {
            let target_class = argmax(target_row.iter().copied());
            let pred_class = argmax(pred_row.iter().copied());
            if target_class == pred_class {
                self.correct += 1;
            }
            self.total += 1;
        }
    }

    pub fn result(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f32 / self.total as f32
        }
    }

    pub fn reset(&mut self) {
        self.correct = 0;
        self.total = 0;
    }
}

fn argmax(values: impl Iterator<Item = f32>) -> usize {
    values
        .enumerate()
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(index, _)| index)
        .unwrap_or(0)
}

/// Loss and accuracy accumulators for one phase (train, validation, test).
#[derive(Debug, Clone, Default)]
pub struct PhaseMetrics {
    pub loss: Mean,
    pub accuracy: CategoricalAccuracy,
}

impl PhaseMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.loss.reset();
        self.accuracy.reset();
    }
}
