//! Fitted pipeline: standard scaler followed by an estimator, plus the
//! metadata needed to audit where it came from.

use chrono::{DateTime, NaiveDateTime, Utc};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use tickcast_core::domain::{Observation, FEATURE_COUNT};

use crate::dataset::{Dataset, Direction, Targets, Task};
use crate::metrics;
use crate::model::{Estimator, ModelError};
use crate::scaler::StandardScaler;

/// Provenance of a fitted pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineMetadata {
    pub task: Task,
    pub feature_names: Vec<String>,
    pub train_rows: usize,
    pub train_start: NaiveDateTime,
    pub train_end: NaiveDateTime,
    /// [`Dataset::content_hash`] of the training rows.
    pub dataset_hash: String,
    pub trained_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPipeline {
    pub metadata: PipelineMetadata,
    scaler: StandardScaler,
    estimator: Estimator,
}

/// One observation's prediction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "lowercase")]
pub enum Prediction {
    Regression { high: f64, low: f64, close: f64 },
    Classification { direction: Direction },
}

impl FittedPipeline {
    /// Fit the scaler and the task's estimator on every row of `train`.
    pub fn fit(train: &Dataset) -> Result<Self, ModelError> {
        let (Some(&train_start), Some(&train_end)) =
            (train.timestamps().first(), train.timestamps().last())
        else {
            return Err(ModelError::EmptyTrainingSet);
        };

        let scaler = StandardScaler::fit(train.features())?;
        let scaled = scaler.transform(train.features())?;
        let estimator = Estimator::fit(&scaled, train.targets())?;

        Ok(Self {
            metadata: PipelineMetadata {
                task: train.task(),
                feature_names: train.feature_names().iter().map(|s| s.to_string()).collect(),
                train_rows: train.len(),
                train_start,
                train_end,
                dataset_hash: train.content_hash(),
                trained_at: Utc::now(),
            },
            scaler,
            estimator,
        })
    }

    pub fn task(&self) -> Task {
        self.metadata.task
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn estimator(&self) -> &Estimator {
        &self.estimator
    }

    /// Predict raw (unscaled) feature rows.
    pub fn predict(&self, features: &Array2<f64>) -> Result<Targets, ModelError> {
        let scaled = self.scaler.transform(features)?;
        self.estimator.predict(&scaled)
    }

    /// Score the pipeline on a dataset of the same task.
    pub fn score(&self, test: &Dataset) -> Result<f64, ModelError> {
        if test.task() != self.task() {
            return Err(ModelError::TaskMismatch {
                expected: self.task(),
                got: test.task(),
            });
        }
        let predicted = self.predict(test.features())?;
        metrics::score(test.targets(), &predicted)
    }

    /// Predict from one observation's feature view.
    pub fn predict_observation(&self, observation: &Observation) -> Result<Prediction, ModelError> {
        let row = Array2::from_shape_fn((1, FEATURE_COUNT), |(_, j)| observation.features()[j]);
        match self.predict(&row)? {
            Targets::Regression(y) => Ok(Prediction::Regression {
                high: y[[0, 0]],
                low: y[[0, 1]],
                close: y[[0, 2]],
            }),
            Targets::Classification(y) => y
                .first()
                .map(|&direction| Prediction::Classification { direction })
                .ok_or(ModelError::EmptyTrainingSet),
        }
    }
}
