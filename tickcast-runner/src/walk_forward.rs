//! Walk-forward evaluation: forward-chaining folds with an expanding
//! training window.
//!
//! Rows are split into `fold_count + 1` equal chunks of `rows / (fold_count + 1)`
//! rows; any remainder goes to the first training window. Fold `i` tests on the
//! chunk ending `fold_count - i` chunks before the end and trains on every row
//! before it:
//!
//! ```text
//! rows = 10, fold_count = 3, test_size = 2
//! fold 0: train [0, 4)  test [4, 6)
//! fold 1: train [0, 6)  test [6, 8)
//! fold 2: train [0, 8)  test [8, 10)
//! ```
//!
//! Every fold fits a fresh pipeline on its own training rows, so the scaler
//! never sees test rows.

use std::ops::Range;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::dataset::Dataset;
use crate::model::ModelError;
use crate::pipeline::FittedPipeline;

// ─── Configuration ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkForwardConfig {
    /// Number of folds (default 5). Must be at least 2 and below the row count.
    pub fold_count: usize,
    /// Smallest acceptable first training window (default 1).
    pub min_train_rows: usize,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        Self {
            fold_count: 5,
            min_train_rows: 1,
        }
    }
}

impl WalkForwardConfig {
    pub fn with_folds(fold_count: usize) -> Self {
        Self {
            fold_count,
            ..Self::default()
        }
    }
}

// ─── Result types ────────────────────────────────────────────────────

/// Row ranges of a single fold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldSpec {
    pub fold_index: usize,
    /// Training rows always start at 0; end is exclusive.
    pub train_end: usize,
    pub test_start: usize,
    /// Exclusive.
    pub test_end: usize,
}

impl FoldSpec {
    pub fn train_rows(&self) -> Range<usize> {
        0..self.train_end
    }

    pub fn test_rows(&self) -> Range<usize> {
        self.test_start..self.test_end
    }
}

/// Out-of-sample score of one fold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldScore {
    pub fold_index: usize,
    pub train_rows: Range<usize>,
    pub test_rows: Range<usize>,
    /// Last training timestamp.
    pub train_end: NaiveDateTime,
    /// First test timestamp.
    pub test_start: NaiveDateTime,
    /// R² for regression, accuracy for classification.
    pub score: f64,
}

#[derive(Debug, Error)]
pub enum WalkForwardError {
    #[error("invalid fold count {fold_count} for {rows} rows (need 2 <= folds < rows)")]
    InvalidFoldCount { fold_count: usize, rows: usize },

    #[error("first training window has {train_rows} rows, minimum is {min_train_rows}")]
    TrainingWindowTooSmall {
        train_rows: usize,
        min_train_rows: usize,
    },

    #[error("model error on fold {fold}: {source}")]
    Model {
        fold: usize,
        #[source]
        source: ModelError,
    },
}

// ─── Fold creation ───────────────────────────────────────────────────

/// Create forward-chaining fold specifications for `rows` rows.
pub fn create_folds(
    rows: usize,
    config: &WalkForwardConfig,
) -> Result<Vec<FoldSpec>, WalkForwardError> {
    let k = config.fold_count;
    if k < 2 || k >= rows {
        return Err(WalkForwardError::InvalidFoldCount {
            fold_count: k,
            rows,
        });
    }

    let test_size = rows / (k + 1);
    let first_train = rows - k * test_size;
    if first_train < config.min_train_rows {
        return Err(WalkForwardError::TrainingWindowTooSmall {
            train_rows: first_train,
            min_train_rows: config.min_train_rows,
        });
    }

    Ok((0..k)
        .map(|i| {
            let test_start = rows - (k - i) * test_size;
            FoldSpec {
                fold_index: i,
                train_end: test_start,
                test_start,
                test_end: test_start + test_size,
            }
        })
        .collect())
}

// ─── Evaluation ──────────────────────────────────────────────────────

/// Evaluate with `fold_count` folds and the default minimum training window.
pub fn evaluate(dataset: &Dataset, fold_count: usize) -> Result<Vec<FoldScore>, WalkForwardError> {
    evaluate_with(dataset, &WalkForwardConfig::with_folds(fold_count))
}

/// Fit and score a fresh pipeline per fold, in fold order.
pub fn evaluate_with(
    dataset: &Dataset,
    config: &WalkForwardConfig,
) -> Result<Vec<FoldScore>, WalkForwardError> {
    let folds = create_folds(dataset.len(), config)?;
    let timestamps = dataset.timestamps();

    let mut scores = Vec::with_capacity(folds.len());
    for fold in &folds {
        let model_err = |source| WalkForwardError::Model {
            fold: fold.fold_index,
            source,
        };
        let train = dataset.slice(fold.train_rows());
        let test = dataset.slice(fold.test_rows());

        let pipeline = FittedPipeline::fit(&train).map_err(model_err)?;
        let score = pipeline.score(&test).map_err(model_err)?;

        debug!(
            fold = fold.fold_index,
            train_rows = train.len(),
            test_rows = test.len(),
            score,
            "fold scored"
        );
        scores.push(FoldScore {
            fold_index: fold.fold_index,
            train_rows: fold.train_rows(),
            test_rows: fold.test_rows(),
            train_end: timestamps[fold.train_end - 1],
            test_start: timestamps[fold.test_start],
            score,
        });
    }
    Ok(scores)
}

/// Mean of the fold scores; `None` for no folds.
pub fn mean_score(scores: &[FoldScore]) -> Option<f64> {
    if scores.is_empty() {
        return None;
    }
    Some(scores.iter().map(|s| s.score).sum::<f64>() / scores.len() as f64)
}
