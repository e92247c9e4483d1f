//! Single-batch training and evaluation steps.

use crate::batch::Batch;
use crate::errors::TrainError;
use crate::loss::categorical_cross_entropy;
use crate::metrics::PhaseMetrics;
use crate::model::GraphModel;
use crate::optim::Optimizer;

/// One optimization step: forward pass, loss, gradients, parameter
/// update, then metric accumulation.
pub fn train_step<M, O>(
    model: &mut M,
    optimizer: &mut O,
    batch: &Batch,
    metrics: &mut PhaseMetrics,
) -> Result<(), TrainError>
where
    M: GraphModel,
    O: Optimizer,
{
    let predictions = model.forward(
        batch.adjacency.view(),
        batch.features.view(),
        batch.membership.view(),
    )?;
    let loss = categorical_cross_entropy(batch.labels.view(), predictions.view())?;
    let gradients = model.loss_gradients(batch, &predictions)?;
    optimizer.step(model.parameters_mut(), &gradients)?;

    metrics.loss.update(loss);
    metrics
        .accuracy
        .update(batch.labels.view(), predictions.view());
    Ok(())
}

/// One evaluation step: forward pass and metric accumulation only.
/// Takes the model by shared reference, so no parameter can change.
pub fn eval_step<M>(
    model: &M,
    batch: &Batch,
    metrics: &mut PhaseMetrics,
) -> Result<(), TrainError>
where
    M: GraphModel,
{
    let predictions = model.forward(
        batch.adjacency.view(),
        batch.features.view(),
        batch.membership.view(),
    )?;
    let loss = categorical_cross_entropy(batch.labels.view(), predictions.view())?;

    metrics.loss.update(loss);
    metrics
        .accuracy
        .update(batch.labels.view(), predictions.view());
    Ok(())
}
