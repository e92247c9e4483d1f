//! Loss computation for graph classification.

use ndarray::ArrayView2;

use crate::errors::TrainError;

/// Clamp bound keeping `ln` finite on degenerate probabilities.
const EPSILON: f32 = 1e-7;

/// Categorical cross-entropy between one-hot targets and predicted
/// class probabilities, averaged over the batch rows.
///
/// Inputs are probability distributions (not logits); predictions are
/// clamped to `[1e-7, 1 - 1e-7]` before taking the logarithm.
pub fn categorical_cross_entropy(
    targets: ArrayView2<f32>,
    predictions: ArrayView2<f32>,
) -> Result<f32, TrainError> {
    if targets.dim() != predictions.dim() {
        return Err(TrainError::DimensionMismatch(format!(
            "targets are {:?} but predictions are {:?}",
            targets.dim(),
            predictions.dim()
        )));
    }
    if targets.nrows() == 0 {
        return Err(TrainError::InvalidInput(
            "cannot compute loss over an empty batch".to_string(),
        ));
    }

    let mut total = 0.0;
    for (target_row, pred_row) in targets.rows().into_iter().zip(predictions.rows()) {
        let row_loss: f32 = target_row
            .iter()
            .zip(pred_row.iter())
            .map(|(&y, &p)| -y * p.clamp(EPSILON, 1.0 - EPSILON).ln())
            .sum();
        total += row_loss;
    }

    Ok(total / targets.nrows() as f32)
}
