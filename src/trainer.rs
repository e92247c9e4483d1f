//! Epoch-level training orchestration.
//!
//! [`Trainer::fit`] runs the full supervised loop: for each epoch it
//! streams mini-batches from the training set through [`train_step`],
//! reports the accumulated metrics, evaluates on the validation set,
//! reports again, records an [`EpochSummary`], and resets both phases'
//! accumulators. After the last epoch the held-out test set gets one
//! evaluation pass.

use log::info;

use crate::batch::BatchIter;
use crate::data::GraphDataset;
use crate::errors::TrainError;
use crate::metrics::PhaseMetrics;
use crate::model::GraphModel;
use crate::optim::Optimizer;
use crate::steps::{eval_step, train_step};

/// Knobs for a [`Trainer`] run.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrainerConfig {
    /// Number of passes over the training set.
    pub epochs: u32,
    /// Samples per mini-batch. The final batch of a pass may be short.
    pub batch_size: usize,
    /// Reshuffle the training samples before every epoch. Validation and
    /// test passes always run in stored order.
    pub shuffle: bool,
    /// Base seed for the per-epoch shuffles. `None` draws from entropy.
    pub seed: Option<u64>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            epochs: 10,
            batch_size: 32,
            shuffle: false,
            seed: None,
        }
    }
}

impl TrainerConfig {
    fn validate(&self) -> Result<(), TrainError> {
        if self.epochs == 0 {
            return Err(TrainError::InvalidConfiguration(
                "epochs must be greater than 0".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(TrainError::InvalidConfiguration(
                "batch_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Metrics recorded at the end of one epoch, after the validation pass
/// and before the accumulators are reset.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EpochSummary {
    pub epoch: u32,
    pub train_loss: f32,
    pub train_accuracy: f32,
    pub val_loss: f32,
    pub val_accuracy: f32,
}

/// Outcome of a completed [`Trainer::fit`] run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FitReport {
    /// One entry per epoch, in order.
    pub history: Vec<EpochSummary>,
    pub test_loss: f32,
    pub test_accuracy: f32,
}

/// Supervised training driver pairing an optimizer with per-phase metrics.
pub struct Trainer<O: Optimizer> {
    config: TrainerConfig,
    optimizer: O,
    train_metrics: PhaseMetrics,
    val_metrics: PhaseMetrics,
    test_metrics: PhaseMetrics,
}

impl<O: Optimizer> Trainer<O> {
    pub fn new(config: TrainerConfig, optimizer: O) -> Result<Self, TrainError> {
        config.validate()?;
        Ok(Self {
            config,
            optimizer,
            train_metrics: PhaseMetrics::new(),
            val_metrics: PhaseMetrics::new(),
            test_metrics: PhaseMetrics::new(),
        })
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Run the full loop: `epochs` passes of train + validate, then one
    /// test pass. Returns the recorded history and final test metrics.
    pub fn fit<M: GraphModel>(
        &mut self,
        model: &mut M,
        train: &GraphDataset,
        validation: &GraphDataset,
        test: &GraphDataset,
    ) -> Result<FitReport, TrainError> {
        let mut history = Vec::with_capacity(self.config.epochs as usize);

        for epoch in 0..self.config.epochs {
            for batch in self.train_batches(train, epoch)? {
                train_step(model, &mut self.optimizer, &batch, &mut self.train_metrics)?;
            }
            info!(
                "epoch {}: train loss {:.4}, train accuracy {:.2}%",
                epoch + 1,
                self.train_metrics.loss.result(),
                self.train_metrics.accuracy.result() * 100.0
            );

            for batch in validation.batches(self.config.batch_size)? {
                eval_step(model, &batch, &mut self.val_metrics)?;
            }
            info!(
                "epoch {}: val loss {:.4}, val accuracy {:.2}%",
                epoch + 1,
                self.val_metrics.loss.result(),
                self.val_metrics.accuracy.result() * 100.0
            );

            history.push(EpochSummary {
                epoch: epoch + 1,
                train_loss: self.train_metrics.loss.result(),
                train_accuracy: self.train_metrics.accuracy.result(),
                val_loss: self.val_metrics.loss.result(),
                val_accuracy: self.val_metrics.accuracy.result(),
            });

            self.train_metrics.reset();
            self.val_metrics.reset();
        }

        for batch in test.batches(self.config.batch_size)? {
            eval_step(model, &batch, &mut self.test_metrics)?;
        }
        let test_loss = self.test_metrics.loss.result();
        let test_accuracy = self.test_metrics.accuracy.result();
        info!(
            "test loss {:.4}, test accuracy {:.2}%",
            test_loss,
            test_accuracy * 100.0
        );
        self.test_metrics.reset();

        Ok(FitReport {
            history,
            test_loss,
            test_accuracy,
        })
    }

    /// Training-set batch stream for one epoch, shuffled if configured.
    /// Each epoch derives its own seed so permutations differ per pass
    /// while staying reproducible from the base seed.
    fn train_batches<'a>(
        &self,
        train: &'a GraphDataset,
        epoch: u32,
    ) -> Result<BatchIter<'a>, TrainError> {
        if self.config.shuffle {
            let seed = self.config.seed.map(|s| s.wrapping_add(epoch as u64));
            train.shuffled_batches(self.config.batch_size, seed)
        } else {
            train.batches(self.config.batch_size)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::GraphDataset;
    use crate::model::MeanPoolClassifier;
    use crate::optim::Adam;
    use ndarray::{Array1, Array2};

    fn toy_dataset(num_samples: usize) -> GraphDataset {
        let mut features = Vec::new();
        let mut adjacency = Vec::new();
        let mut labels = Vec::new();
        let mut membership = Vec::new();

        for i in 0..num_samples {
            let nodes = 2 + i % 3;
            let class = i % 2;
            let mut feats = Array2::zeros((nodes, 2));
            feats.column_mut(class).fill(1.0);
            features.push(feats);
            adjacency.push(Array2::eye(nodes));
            let mut label = Array1::zeros(2);
            label[class] = 1.0;
            labels.push(label);
            membership.push(Array1::from_elem(nodes, i));
        }

        GraphDataset::new(features, adjacency, labels, membership).unwrap()
    }

    #[test]
    fn test_fit_records_one_summary_per_epoch() {
        let config = TrainerConfig {
            epochs: 3,
            batch_size: 2,
            shuffle: false,
            seed: None,
        };
        let mut trainer = Trainer::new(config, Adam::new(0.01)).unwrap();
        let mut model = MeanPoolClassifier::new(2, 2, Some(3)).unwrap();
        let data = toy_dataset(6);

        let report = trainer.fit(&mut model, &data, &data, &data).unwrap();
        assert_eq!(report.history.len(), 3);
        assert_eq!(report.history[0].epoch, 1);
        assert_eq!(report.history[2].epoch, 3);
    }

    #[test]
    fn test_fit_improves_on_separable_data() {
        let config = TrainerConfig {
            epochs: 40,
            batch_size: 2,
            shuffle: false,
            seed: None,
        };
        let mut trainer = Trainer::new(config, Adam::new(0.05)).unwrap();
        let mut model = MeanPoolClassifier::new(2, 2, Some(11)).unwrap();
        let data = toy_dataset(8);

        let report = trainer.fit(&mut model, &data, &data, &data).unwrap();
        let first = &report.history[0];
        let last = report.history.last().unwrap();
        assert!(last.train_loss < first.train_loss);
        assert!(report.test_accuracy >= 0.75);
    }

    #[test]
    fn test_zero_epochs_rejected() {
        let config = TrainerConfig {
            epochs: 0,
            ..TrainerConfig::default()
        };
        let result = Trainer::new(config, Adam::default());
        assert!(matches!(
            result,
            Err(TrainError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let config = TrainerConfig {
            batch_size: 0,
            ..TrainerConfig::default()
        };
        let result = Trainer::new(config, Adam::default());
        assert!(matches!(
            result,
            Err(TrainError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_shuffled_fit_is_reproducible_with_seed() {
        let make_report = || {
            let config = TrainerConfig {
                epochs: 4,
                batch_size: 3,
                shuffle: true,
                seed: Some(42),
            };
            let mut trainer = Trainer::new(config, Adam::new(0.01)).unwrap();
            let mut model = MeanPoolClassifier::new(2, 2, Some(5)).unwrap();
            let data = toy_dataset(7);
            trainer.fit(&mut model, &data, &data, &data).unwrap()
        };

        assert_eq!(make_report(), make_report());
    }
}
