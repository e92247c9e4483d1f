//! Graph sample collections.
//!
//! A [`GraphDataset`] holds four parallel per-sample sequences: node-feature
//! matrices, square adjacency matrices, one-hot label vectors, and per-node
//! graph-membership index vectors. Index `i` across all four refers to the
//! same graph sample. All cross-sequence invariants are checked once at
//! construction so that batch assembly never has to re-validate.

use ndarray::{Array1, Array2};

use crate::batch::BatchIter;
use crate::errors::TrainError;

/// Node-feature matrix type: `[num_nodes, feature_dim]`.
pub type NodeFeatures = Array2<f32>;

/// Square adjacency matrix type: `[num_nodes, num_nodes]`.
pub type Adjacency = Array2<f32>;

/// One-hot label vector type: `[num_classes]`.
pub type Label = Array1<f32>;

/// Per-node graph-membership index vector: `[num_nodes]`.
///
/// Each entry tags the graph a node belongs to. Within one sample the
/// entries must be non-decreasing; batching rebases them so every batch
/// starts at graph 0.
pub type Membership = Array1<usize>;

/// A collection of graph-classification samples ready for mini-batching.
#[derive(Debug, Clone)]
pub struct GraphDataset {
    features: Vec<NodeFeatures>,
    adjacency: Vec<Adjacency>,
    labels: Vec<Label>,
    membership: Vec<Membership>,
}

impl GraphDataset {
    /// Build a dataset from the four parallel sequences, validating that
    /// they describe the same samples.
    ///
    /// Checks performed per sample `i`:
    /// - sample `i` has at least one node,
    /// - adjacency `i` is square with side equal to the node count of
    ///   feature matrix `i`,
    /// - membership vector `i` has one entry per node and is non-decreasing,
    /// - feature and label dimensions are consistent across all samples.
    pub fn new(
        features: Vec<NodeFeatures>,
        adjacency: Vec<Adjacency>,
        labels: Vec<Label>,
        membership: Vec<Membership>,
    ) -> Result<Self, TrainError> {
        let n = features.len();
        if n == 0 {
            return Err(TrainError::InvalidInput(
                "dataset must contain at least one sample".to_string(),
            ));
        }
        if adjacency.len() != n || labels.len() != n || membership.len() != n {
            return Err(TrainError::DimensionMismatch(format!(
                "parallel sequence lengths differ: {} features, {} adjacency, {} labels, {} membership",
                n,
                adjacency.len(),
                labels.len(),
                membership.len()
            )));
        }

        let feature_dim = features[0].ncols();
        let num_classes = labels[0].len();

        for i in 0..n {
            let nodes = features[i].nrows();

            if nodes == 0 {
                return Err(TrainError::InvalidInput(format!(
                    "sample {}: graph has no nodes",
                    i
                )));
            }
            if features[i].ncols() != feature_dim {
                return Err(TrainError::DimensionMismatch(format!(
                    "sample {}: feature dimension {} differs from {}",
                    i,
                    features[i].ncols(),
                    feature_dim
                )));
            }
            if adjacency[i].nrows() != nodes || adjacency[i].ncols() != nodes {
                return Err(TrainError::DimensionMismatch(format!(
                    "sample {}: adjacency is {}x{} but the sample has {} nodes",
                    i,
                    adjacency[i].nrows(),
                    adjacency[i].ncols(),
                    nodes
                )));
            }
            if labels[i].len() != num_classes {
                return Err(TrainError::DimensionMismatch(format!(
                    "sample {}: label has {} classes, expected {}",
                    i,
                    labels[i].len(),
                    num_classes
                )));
            }
            if membership[i].len() != nodes {
                return Err(TrainError::DimensionMismatch(format!(
                    "sample {}: membership vector has {} entries but the sample has {} nodes",
                    i,
                    membership[i].len(),
                    nodes
                )));
            }
            let mut pairs = membership[i].iter().zip(membership[i].iter().skip(1));
            if pairs.any(|(a, b)| a > b) {
                return Err(TrainError::InvalidInput(format!(
                    "sample {}: membership indices must be non-decreasing",
                    i
                )));
            }
        }

        Ok(Self {
            features,
            adjacency,
            labels,
            membership,
        })
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Node-feature dimension shared by all samples.
    pub fn feature_dim(&self) -> usize {
        self.features[0].ncols()
    }

    /// Number of label classes shared by all samples.
    pub fn num_classes(&self) -> usize {
        self.labels[0].len()
    }

    /// Total node count across all samples.
    pub fn total_nodes(&self) -> usize {
        self.features.iter().map(|f| f.nrows()).sum()
    }

    /// Lazy mini-batch iterator over the samples in their stored order.
    ///
    /// Yields `ceil(len / batch_size)` batches; the final batch may be
    /// short. The iterator is single-use: construct a fresh one per pass.
    pub fn batches(&self, batch_size: usize) -> Result<BatchIter<'_>, TrainError> {
        BatchIter::in_order(self, batch_size)
    }

    /// Like [`batches`](Self::batches) but with the sample order permuted
    /// uniformly at random before slicing. A seed makes the permutation
    /// reproducible.
    pub fn shuffled_batches(
        &self,
        batch_size: usize,
        seed: Option<u64>,
    ) -> Result<BatchIter<'_>, TrainError> {
        BatchIter::shuffled(self, batch_size, seed)
    }

    pub(crate) fn sample(
        &self,
        i: usize,
    ) -> (&NodeFeatures, &Adjacency, &Label, &Membership) {
        (
            &self.features[i],
            &self.adjacency[i],
            &self.labels[i],
            &self.membership[i],
        )
    }
}

// === TESTS ===

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;

    fn sample(nodes: usize, dim: usize, classes: usize, graph_id: usize) -> (NodeFeatures, Adjacency, Label, Membership) {
        (
            Array2::zeros((nodes, dim)),
            Array2::eye(nodes),
            {
                let mut l = Array1::zeros(classes);
                l[0] = 1.0;
                l
            },
            Array1::from_elem(nodes, graph_id),
        )
    }

    #[test]
    fn test_dataset_creation() {
        let (f0, a0, l0, m0) = sample(2, 3, 2, 0);
        let (f1, a1, l1, m1) = sample(4, 3, 2, 1);

        let ds = GraphDataset::new(vec![f0, f1], vec![a0, a1], vec![l0, l1], vec![m0, m1]).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.feature_dim(), 3);
        assert_eq!(ds.num_classes(), 2);
        assert_eq!(ds.total_nodes(), 6);
    }

    #[test]
    fn test_empty_dataset_rejected() {
        let result = GraphDataset::new(vec![], vec![], vec![], vec![]);
        assert!(matches!(result, Err(TrainError::InvalidInput(_))));
    }

    #[test]
    fn test_zero_node_sample_rejected() {
        // A node-less sample would satisfy every shape check trivially
        // but has no first membership entry to rebase batches against.
        let (empty_f, empty_a, empty_l, empty_m) = sample(0, 3, 2, 0);
        let (f1, a1, l1, m1) = sample(2, 3, 2, 1);

        let result = GraphDataset::new(
            vec![empty_f, f1],
            vec![empty_a, a1],
            vec![empty_l, l1],
            vec![empty_m, m1],
        );
        assert!(matches!(result, Err(TrainError::InvalidInput(_))));
    }

    #[test]
    fn test_mismatched_sequence_lengths_rejected() {
        let (f0, a0, l0, m0) = sample(2, 3, 2, 0);
        let (_, a1, _, _) = sample(4, 3, 2, 1);

        let result = GraphDataset::new(vec![f0], vec![a0, a1], vec![l0], vec![m0]);
        assert!(matches!(result, Err(TrainError::DimensionMismatch(_))));
    }

    #[test]
    fn test_non_square_adjacency_rejected() {
        let (f0, _, l0, m0) = sample(2, 3, 2, 0);
        let ragged = Array2::zeros((2, 3));

        let result = GraphDataset::new(vec![f0], vec![ragged], vec![l0], vec![m0]);
        assert!(matches!(result, Err(TrainError::DimensionMismatch(_))));
    }

    #[test]
    fn test_membership_length_checked() {
        let (f0, a0, l0, _) = sample(3, 2, 2, 0);
        let short = arr1(&[0usize, 0]);

        let result = GraphDataset::new(vec![f0], vec![a0], vec![l0], vec![short]);
        assert!(matches!(result, Err(TrainError::DimensionMismatch(_))));
    }

    #[test]
    fn test_decreasing_membership_rejected() {
        let (f0, a0, l0, _) = sample(3, 2, 2, 0);
        let decreasing = arr1(&[1usize, 0, 0]);

        let result = GraphDataset::new(vec![f0], vec![a0], vec![l0], vec![decreasing]);
        assert!(matches!(result, Err(TrainError::InvalidInput(_))));
    }
}
