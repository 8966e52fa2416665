//! Baseline estimators: multi-output least squares for the regression task,
//! multinomial logistic regression for the direction task.

pub mod linear;
pub mod logistic;

pub use linear::LinearRegression;
pub use logistic::LogisticRegression;

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dataset::{Targets, Task};

#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("cannot fit on zero rows")]
    EmptyTrainingSet,

    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("normal equations are singular even after regularization")]
    Singular,

    #[error("fit produced non-finite parameters")]
    NonFinite,

    #[error("task mismatch: expected {expected}, got {got}")]
    TaskMismatch { expected: Task, got: Task },
}

/// A fitted estimator of either family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Estimator {
    Linear(LinearRegression),
    Logistic(LogisticRegression),
}

impl Estimator {
    /// Fit the estimator family matching the targets.
    pub fn fit(x: &Array2<f64>, targets: &Targets) -> Result<Self, ModelError> {
        if x.nrows() != targets.len() {
            return Err(ModelError::DimensionMismatch {
                expected: x.nrows(),
                got: targets.len(),
            });
        }
        match targets {
            Targets::Regression(y) => LinearRegression::fit(x, y).map(Estimator::Linear),
            Targets::Classification(y) => LogisticRegression::fit(x, y).map(Estimator::Logistic),
        }
    }

    pub fn task(&self) -> Task {
        match self {
            Estimator::Linear(_) => Task::Regression,
            Estimator::Logistic(_) => Task::Classification,
        }
    }

    pub fn n_features(&self) -> usize {
        match self {
            Estimator::Linear(m) => m.n_features(),
            Estimator::Logistic(m) => m.n_features(),
        }
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Targets, ModelError> {
        match self {
            Estimator::Linear(m) => m.predict(x).map(Targets::Regression),
            Estimator::Logistic(m) => m.predict(x).map(Targets::Classification),
        }
    }
}

pub(crate) fn check_columns(x: &Array2<f64>, expected: usize) -> Result<(), ModelError> {
    if x.ncols() != expected {
        return Err(ModelError::DimensionMismatch {
            expected,
            got: x.ncols(),
        });
    }
    Ok(())
}
