//! Mini-batch assembly for graph samples.
//!
//! Batching a slice of graph samples means:
//! - concatenating their node-feature matrices along the row axis,
//! - composing their adjacency matrices into one block-diagonal matrix
//!   (each input occupies a disjoint diagonal block, zero elsewhere),
//! - stacking their one-hot label vectors by row,
//! - concatenating their membership-index vectors, rebased so the first
//!   graph in the batch is graph 0. The model consumes these indices as
//!   direct pooling offsets, so they must be contiguous within a batch.
//!
//! [`BatchIter`] is a lazy, finite, single-use iterator producing
//! `ceil(N / batch_size)` batches; the final batch may be short. Samples are
//! taken in stored order unless shuffling was requested at construction.

use ndarray::{s, Array1, Array2, ArrayView2};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::data::GraphDataset;
use crate::errors::TrainError;

/// One mini-batch of graph samples, ready for a model forward pass.
#[derive(Debug, Clone)]
pub struct Batch {
    /// Concatenated node features: `[total_nodes, feature_dim]`.
    pub features: Array2<f32>,
    /// Dense block-diagonal adjacency: `[total_nodes, total_nodes]`.
    pub adjacency: Array2<f32>,
    /// Stacked one-hot labels: `[num_graphs, num_classes]`.
    pub labels: Array2<f32>,
    /// Zero-based membership indices: `[total_nodes]`, non-decreasing and
    /// contiguous per sub-graph.
    pub membership: Array1<usize>,
}

impl Batch {
    /// Number of graphs in the batch.
    pub fn num_graphs(&self) -> usize {
        self.labels.nrows()
    }

    /// Total node count across the batch.
    pub fn num_nodes(&self) -> usize {
        self.features.nrows()
    }
}

/// Compose square matrices into one block-diagonal matrix.
///
/// The output side length is the sum of the input side lengths; block `k`
/// occupies rows and columns `[offset_k, offset_k + n_k)` and every entry
/// outside the diagonal blocks is zero.
pub fn block_diag(blocks: &[ArrayView2<f32>]) -> Array2<f32> {
    let side: usize = blocks.iter().map(|b| b.nrows()).sum();
    let mut out = Array2::zeros((side, side));

    let mut offset = 0;
    for block in blocks {
        let n = block.nrows();
        out.slice_mut(s![offset..offset + n, offset..offset + n])
            .assign(block);
        offset += n;
    }

    out
}

/// Lazy mini-batch iterator over a [`GraphDataset`].
///
/// Holds a shared borrow of the dataset plus the sample visit order;
/// consuming it twice is not possible, construct a fresh iterator per pass.
#[derive(Debug)]
pub struct BatchIter<'a> {
    dataset: &'a GraphDataset,
    order: Vec<usize>,
    batch_size: usize,
    cursor: usize,
}

impl<'a> BatchIter<'a> {
    pub(crate) fn in_order(
        dataset: &'a GraphDataset,
        batch_size: usize,
    ) -> Result<Self, TrainError> {
        Self::with_order(dataset, batch_size, (0..dataset.len()).collect())
    }

    pub(crate) fn shuffled(
        dataset: &'a GraphDataset,
        batch_size: usize,
        seed: Option<u64>,
    ) -> Result<Self, TrainError> {
        let mut order: Vec<usize> = (0..dataset.len()).collect();
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        order.shuffle(&mut rng);
        Self::with_order(dataset, batch_size, order)
    }

    fn with_order(
        dataset: &'a GraphDataset,
        batch_size: usize,
        order: Vec<usize>,
    ) -> Result<Self, TrainError> {
        if batch_size == 0 {
            return Err(TrainError::InvalidConfiguration(
                "batch size must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            dataset,
            order,
            batch_size,
            cursor: 0,
        })
    }

    /// Number of batches this iterator will yield in total.
    pub fn num_batches(&self) -> usize {
        (self.order.len() + self.batch_size - 1) / self.batch_size
    }

    fn assemble(&self, indices: &[usize]) -> Batch {
        let feature_dim = self.dataset.feature_dim();
        let num_classes = self.dataset.num_classes();

        let total_nodes: usize = indices
            .iter()
            .map(|&i| self.dataset.sample(i).0.nrows())
            .sum();

        let mut features = Array2::zeros((total_nodes, feature_dim));
        let mut labels = Array2::zeros((indices.len(), num_classes));
        let mut membership = Array1::zeros(total_nodes);

        let adjacency_blocks: Vec<ArrayView2<f32>> = indices
            .iter()
            .map(|&i| self.dataset.sample(i).1.view())
            .collect();
        let adjacency = block_diag(&adjacency_blocks);

        let mut row_offset = 0;
        // Each sample's membership entries are shifted down by the sample's
        // own first index and up by the running graph count, so the batch
        // numbering starts at 0 and stays contiguous regardless of which
        // global offsets the samples carried (or of shuffling).
        let mut graph_offset = 0;
        for (slot, &i) in indices.iter().enumerate() {
            let (sample_features, _, sample_label, sample_membership) = self.dataset.sample(i);
            let n = sample_features.nrows();

            features
                .slice_mut(s![row_offset..row_offset + n, ..])
                .assign(sample_features);
            labels.row_mut(slot).assign(sample_label);

            let base = sample_membership[0];
            for (k, &tag) in sample_membership.iter().enumerate() {
                membership[row_offset + k] = tag - base + graph_offset;
            }
            graph_offset += sample_membership[n - 1] - base + 1;

            row_offset += n;
        }

        Batch {
            features,
            adjacency,
            labels,
            membership,
        }
    }
}

impl Iterator for BatchIter<'_> {
    type Item = Batch;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.cursor * self.batch_size;
        if start >= self.order.len() {
            return None;
        }

        let end = (start + self.batch_size).min(self.order.len());
        let batch = self.assemble(&self.order[start..end]);
        self.cursor += 1;

        Some(batch)
    }
}

// === TESTS ===
