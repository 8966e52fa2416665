//! Task scores: R² for regression, exact-match accuracy for classification.

use ndarray::Array2;

use crate::dataset::{Direction, Targets};
use crate::model::ModelError;

/// Coefficient of determination, averaged uniformly over output columns.
///
/// A column with zero variance in the truth scores 1.0 when predicted exactly
/// and 0.0 otherwise.
pub fn r2_score(y_true: &Array2<f64>, y_pred: &Array2<f64>) -> Result<f64, ModelError> {
    if y_true.shape() != y_pred.shape() {
        return Err(ModelError::DimensionMismatch {
            expected: y_true.len(),
            got: y_pred.len(),
        });
    }
    if y_true.is_empty() {
        return Err(ModelError::EmptyTrainingSet);
    }

    let outputs = y_true.ncols();
    let mut total = 0.0;
    for j in 0..outputs {
        let truth = y_true.column(j);
        let pred = y_pred.column(j);
        let mean = truth.sum() / truth.len() as f64;
        let ss_tot: f64 = truth.iter().map(|t| (t - mean).powi(2)).sum();
        let ss_res: f64 = truth
            .iter()
            .zip(pred.iter())
            .map(|(t, p)| (t - p).powi(2))
            .sum();
        total += if ss_tot == 0.0 {
            if ss_res == 0.0 {
                1.0
            } else {
                0.0
            }
        } else {
            1.0 - ss_res / ss_tot
        };
    }
    Ok(total / outputs as f64)
}

/// Fraction of rows predicted exactly.
pub fn accuracy(y_true: &[Direction], y_pred: &[Direction]) -> Result<f64, ModelError> {
    if y_true.len() != y_pred.len() {
        return Err(ModelError::DimensionMismatch {
            expected: y_true.len(),
            got: y_pred.len(),
        });
    }
    if y_true.is_empty() {
        return Err(ModelError::EmptyTrainingSet);
    }
    let hits = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    Ok(hits as f64 / y_true.len() as f64)
}

/// Score predictions against truth with the task's metric.
pub fn score(truth: &Targets, predicted: &Targets) -> Result<f64, ModelError> {
    match (truth, predicted) {
        (Targets::Regression(t), Targets::Regression(p)) => r2_score(t, p),
        (Targets::Classification(t), Targets::Classification(p)) => accuracy(t, p),
        _ => Err(ModelError::TaskMismatch {
            expected: truth.task(),
            got: predicted.task(),
        }),
    }
}
