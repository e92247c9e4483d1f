//! Model interface and a small reference classifier.
//!
//! The training loop is agnostic to model internals: anything implementing
//! [`GraphModel`] can be trained. A model consumes a batch's
//! `(adjacency, features, membership)` triple and produces one row of class
//! probabilities per graph; for training it additionally exposes its
//! trainable parameters and computes the cross-entropy gradients with
//! respect to them. Gradient computation stays inside the model so the
//! loop never needs to know how differentiation happens.

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use ndarray_rand::RandomExt;
use rand::distributions::Uniform;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::batch::Batch;
use crate::errors::TrainError;

/// A trainable graph-classification model.
pub trait GraphModel {
    /// Forward pass: per-graph class probabilities, `[num_graphs, num_classes]`.
    ///
    /// `membership` maps each node (row of `features`) to its zero-based
    /// graph index within the batch; implementations use it as a pooling
    /// offset.
    fn forward(
        &self,
        adjacency: ArrayView2<f32>,
        features: ArrayView2<f32>,
        membership: ArrayView1<usize>,
    ) -> Result<Array2<f32>, TrainError>;

    /// Gradients of the batch-mean categorical cross-entropy with respect
    /// to every trainable parameter, in [`parameters_mut`](Self::parameters_mut)
    /// order. `predictions` is the output of the matching `forward` call.
    fn loss_gradients(
        &self,
        batch: &Batch,
        predictions: &Array2<f32>,
    ) -> Result<Vec<Array2<f32>>, TrainError>;

    /// Mutable references to the trainable parameter tensors.
    fn parameters_mut(&mut self) -> Vec<&mut Array2<f32>>;

    /// Total number of trainable scalars.
    fn parameter_count(&self) -> usize;
}

/// Linear graph classifier with one propagation step and mean pooling.
///
/// Node logits are `H = (A X) W + b`; graph logits are the per-graph mean
/// of the rows of `H` grouped by membership index; probabilities are the
/// row-wise softmax. Gradients are analytic (softmax plus cross-entropy
/// collapse to `P - Y`), so no external differentiation is involved.
#[derive(Debug, Clone)]
pub struct MeanPoolClassifier {
    weight: Array2<f32>,
    bias: Array2<f32>,
}

impl MeanPoolClassifier {
    /// Create a classifier with Glorot-uniform weights and zero bias.
    pub fn new(feature_dim: usize, num_classes: usize, seed: Option<u64>) -> Result<Self, TrainError> {
        if feature_dim == 0 || num_classes == 0 {
            return Err(TrainError::InvalidConfiguration(
                "feature dimension and class count must be greater than 0".to_string(),
            ));
        }

        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let limit = (6.0 / (feature_dim + num_classes) as f32).sqrt();
        let weight = Array2::random_using(
            (feature_dim, num_classes),
            Uniform::new(-limit, limit),
            &mut rng,
        );

        Ok(Self {
            weight,
            bias: Array2::zeros((1, num_classes)),
        })
    }

    /// Mean-pool node rows into per-graph rows using membership offsets.
    fn pool(
        node_values: &Array2<f32>,
        membership: ArrayView1<usize>,
    ) -> Result<(Array2<f32>, Vec<usize>), TrainError> {
        let num_graphs = match membership.iter().max() {
            Some(&max) => max + 1,
            None => {
                return Err(TrainError::InvalidInput(
                    "cannot pool an empty batch".to_string(),
                ))
            }
        };

        let mut pooled = Array2::zeros((num_graphs, node_values.ncols()));
        let mut counts = vec![0usize; num_graphs];

        for (row, &graph) in node_values.rows().into_iter().zip(membership.iter()) {
            let mut target = pooled.row_mut(graph);
            target += &row;
            counts[graph] += 1;
        }

        for (graph, &count) in counts.iter().enumerate() {
            if count == 0 {
                return Err(TrainError::InvalidInput(format!(
                    "membership indices skip graph {}; pooling offsets must be contiguous",
                    graph
                )));
            }
            let mut row = pooled.row_mut(graph);
            row /= count as f32;
        }

        Ok((pooled, counts))
    }

    fn node_logits(
        &self,
        adjacency: ArrayView2<f32>,
        features: ArrayView2<f32>,
    ) -> Result<Array2<f32>, TrainError> {
        if adjacency.nrows() != adjacency.ncols() {
            return Err(TrainError::DimensionMismatch(format!(
                "adjacency is {}x{}, expected square",
                adjacency.nrows(),
                adjacency.ncols()
            )));
        }
        if adjacency.nrows() != features.nrows() {
            return Err(TrainError::DimensionMismatch(format!(
                "adjacency side {} does not match {} feature rows",
                adjacency.nrows(),
                features.nrows()
            )));
        }
        if features.ncols() != self.weight.nrows() {
            return Err(TrainError::DimensionMismatch(format!(
                "features have dimension {} but the model expects {}",
                features.ncols(),
                self.weight.nrows()
            )));
        }

        let propagated = adjacency.dot(&features);
        Ok(propagated.dot(&self.weight) + &self.bias)
    }
}

impl GraphModel for MeanPoolClassifier {
    fn forward(
        &self,
        adjacency: ArrayView2<f32>,
        features: ArrayView2<f32>,
        membership: ArrayView1<usize>,
    ) -> Result<Array2<f32>, TrainError> {
        if membership.len() != features.nrows() {
            return Err(TrainError::DimensionMismatch(format!(
                "membership has {} entries but the batch has {} nodes",
                membership.len(),
                features.nrows()
            )));
        }

        let node_logits = self.node_logits(adjacency, features)?;
        let (graph_logits, _) = Self::pool(&node_logits, membership)?;
        Ok(softmax_rows(&graph_logits))
    }

    fn loss_gradients(
        &self,
        batch: &Batch,
        predictions: &Array2<f32>,
    ) -> Result<Vec<Array2<f32>>, TrainError> {
        if predictions.dim() != batch.labels.dim() {
            return Err(TrainError::DimensionMismatch(format!(
                "predictions are {:?} but batch labels are {:?}",
                predictions.dim(),
                batch.labels.dim()
            )));
        }

        let num_graphs = predictions.nrows() as f32;
        // softmax + cross-entropy, mean-reduced over the batch.
        let grad_logits = (predictions - &batch.labels) / num_graphs;

        // Scatter the per-graph gradient back through the mean pooling.
        let (_, counts) = Self::pool(
            &Array2::zeros((batch.features.nrows(), 1)),
            batch.membership.view(),
        )?;
        let mut grad_nodes = Array2::zeros((batch.features.nrows(), predictions.ncols()));
        for (mut row, &graph) in grad_nodes.rows_mut().into_iter().zip(batch.membership.iter()) {
            let scaled = grad_logits.row(graph).mapv(|g| g / counts[graph] as f32);
            row.assign(&scaled);
        }

        let propagated = batch.adjacency.dot(&batch.features);
        let grad_weight = propagated.t().dot(&grad_nodes);
        let grad_bias = grad_nodes.sum_axis(Axis(0)).insert_axis(Axis(0));

        Ok(vec![grad_weight, grad_bias])
    }

    fn parameters_mut(&mut self) -> Vec<&mut Array2<f32>> {
        vec![&mut self.weight, &mut self.bias]
    }

    fn parameter_count(&self) -> usize {
        self.weight.len() + self.bias.len()
    }
}

/// Numerically stable row-wise softmax.
fn softmax_rows(logits: &Array2<f32>) -> Array2<f32> {
    let mut probs = logits.clone();
    for mut row in probs.rows_mut() {
        let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        row.mapv_inplace(|x| (x - max).exp());
        let sum = row.sum();
        row /= sum;
    }
    probs
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{arr1, arr2};

    fn tiny_batch() -> Batch {
        Batch {
            features: arr2(&[[1.0f32, 0.0], [0.0, 1.0], [1.0, 1.0]]),
            adjacency: arr2(&[
                [1.0f32, 1.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 0.0, 1.0],
            ]),
            labels: arr2(&[[1.0f32, 0.0], [0.0, 1.0]]),
            membership: arr1(&[0usize, 0, 1]),
        }
    }

    #[test]
    fn test_forward_shape_and_row_sums() {
        let model = MeanPoolClassifier::new(2, 2, Some(1)).unwrap();
        let batch = tiny_batch();

        let probs = model
            .forward(
                batch.adjacency.view(),
                batch.features.view(),
                batch.membership.view(),
            )
            .unwrap();

        assert_eq!(probs.dim(), (2, 2));
        for row in probs.rows() {
            assert_abs_diff_eq!(row.sum(), 1.0, epsilon = 1e-5);
            assert!(row.iter().all(|&p| p > 0.0));
        }
    }

    #[test]
    fn test_forward_rejects_ragged_inputs() {
        let model = MeanPoolClassifier::new(2, 2, Some(1)).unwrap();
        let batch = tiny_batch();
        let bad_adjacency = arr2(&[[1.0f32, 0.0], [0.0, 1.0]]);

        let result = model.forward(
            bad_adjacency.view(),
            batch.features.view(),
            batch.membership.view(),
        );
        assert!(matches!(result, Err(TrainError::DimensionMismatch(_))));
    }

    #[test]
    fn test_gradient_shapes_match_parameters() {
        let mut model = MeanPoolClassifier::new(2, 2, Some(1)).unwrap();
        let batch = tiny_batch();
        let predictions = model
            .forward(
                batch.adjacency.view(),
                batch.features.view(),
                batch.membership.view(),
            )
            .unwrap();

        let gradients = model.loss_gradients(&batch, &predictions).unwrap();
        let shapes: Vec<_> = gradients.iter().map(|g| g.dim()).collect();
        let param_shapes: Vec<_> = model.parameters_mut().iter().map(|p| p.dim()).collect();
        assert_eq!(shapes, param_shapes);
    }

    #[test]
    fn test_gradient_is_zero_for_exact_predictions() {
        let model = MeanPoolClassifier::new(2, 2, Some(1)).unwrap();
        let batch = tiny_batch();

        // When predictions equal the labels, P - Y vanishes.
        let gradients = model.loss_gradients(&batch, &batch.labels.clone()).unwrap();
        for grad in gradients {
            for &g in grad.iter() {
                assert_abs_diff_eq!(g, 0.0, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_parameter_count() {
        let model = MeanPoolClassifier::new(4, 3, Some(1)).unwrap();
        assert_eq!(model.parameter_count(), 4 * 3 + 3);
    }

    #[test]
    fn test_seeded_init_is_reproducible() {
        let a = MeanPoolClassifier::new(3, 2, Some(9)).unwrap();
        let b = MeanPoolClassifier::new(3, 2, Some(9)).unwrap();
        assert_eq!(a.weight, b.weight);
    }
}
