//! Mini-batch supervised training for graph classification.
//!
//! The crate covers the full loop for training a graph classifier on a
//! dataset of variable-size graphs:
//!
//! - [`GraphDataset`] holds per-sample node features, adjacency matrices,
//!   one-hot labels, and node-to-graph membership vectors.
//! - [`BatchIter`] assembles mini-batches by row-concatenating features
//!   and labels, composing adjacency matrices into a block-diagonal
//!   matrix, and rebasing membership indices to start at graph zero.
//! - [`GraphModel`] is the model seam; [`MeanPoolClassifier`] is a small
//!   reference implementation with analytic gradients.
//! - [`Trainer`] drives epochs of [`train_step`] and [`eval_step`],
//!   accumulating loss and accuracy per phase and producing a
//!   [`FitReport`].
//!
//! ```
//! use gnn_trainer::{
//!     Adam, GraphDataset, MeanPoolClassifier, Trainer, TrainerConfig,
//! };
//! use ndarray::{arr1, arr2};
//!
//! let dataset = GraphDataset::new(
//!     vec![arr2(&[[1.0, 0.0], [0.0, 1.0]]), arr2(&[[1.0, 1.0]])],
//!     vec![arr2(&[[1.0, 1.0], [1.0, 1.0]]), arr2(&[[1.0]])],
//!     vec![arr1(&[1.0, 0.0]), arr1(&[0.0, 1.0])],
//!     vec![arr1(&[0, 0]), arr1(&[1])],
//! )
//! .unwrap();
//!
//! let config = TrainerConfig {
//!     epochs: 2,
//!     batch_size: 2,
//!     shuffle: false,
//!     seed: None,
//! };
//! let mut trainer = Trainer::new(config, Adam::new(0.01)).unwrap();
//! let mut model = MeanPoolClassifier::new(2, 2, Some(0)).unwrap();
//!
//! let report = trainer.fit(&mut model, &dataset, &dataset, &dataset).unwrap();
//! assert_eq!(report.history.len(), 2);
//! ```

pub mod batch;
pub mod data;
pub mod errors;
pub mod loss;
pub mod metrics;
pub mod model;
pub mod optim;
pub mod steps;
pub mod trainer;

pub use batch::{block_diag, Batch, BatchIter};
pub use data::{Adjacency, GraphDataset, Label, Membership, NodeFeatures};
pub use errors::TrainError;
pub use loss::categorical_cross_entropy;
pub use metrics::{CategoricalAccuracy, Mean, PhaseMetrics};
pub use model::{GraphModel, MeanPoolClassifier};
pub use optim::{Adam, Optimizer, Sgd};
pub use steps::{eval_step, train_step};
pub use trainer::{EpochSummary, FitReport, Trainer, TrainerConfig};
