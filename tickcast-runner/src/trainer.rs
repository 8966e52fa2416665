//! Trainer: chronological 70/30 split, fit, score, optional persistence.

use std::ops::Range;
use std::path::PathBuf;

use chrono::NaiveDateTime;
use thiserror::Error;
use tracing::info;

use crate::artifact::{ArtifactError, ArtifactStore};
use crate::dataset::{Dataset, Task};
use crate::model::ModelError;
use crate::pipeline::FittedPipeline;

#[derive(Debug, Error)]
pub enum TrainError {
    #[error("no trained artifact at {0}")]
    ArtifactNotFound(PathBuf),

    #[error("artifact serialization failed: {0}")]
    Serialization(String),

    #[error("artifact I/O failed: {0}")]
    Io(String),

    #[error("{rows} rows cannot be split into non-empty train and test sets")]
    SplitTooSmall { rows: usize },

    #[error("dataset is for {got}, trainer is for {expected}")]
    TaskMismatch { expected: Task, got: Task },

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl From<ArtifactError> for TrainError {
    fn from(e: ArtifactError) -> Self {
        match e {
            ArtifactError::NotFound(path) => TrainError::ArtifactNotFound(path),
            ArtifactError::Io { .. } => TrainError::Io(e.to_string()),
            // A slot holding the other task's pipeline is unusable content.
            ArtifactError::Serialization { .. } | ArtifactError::TaskMismatch { .. } => {
                TrainError::Serialization(e.to_string())
            }
        }
    }
}

/// One side of the chronological split.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitPart {
    pub rows: Range<usize>,
    pub timestamps: Vec<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChronoSplit {
    pub train: SplitPart,
    pub test: SplitPart,
}

#[derive(Debug, Clone)]
pub struct TrainOutcome {
    pub pipeline: FittedPipeline,
    /// Test-set R² or accuracy.
    pub score: f64,
    pub split: ChronoSplit,
    /// Slot written, when persisted.
    pub artifact: Option<PathBuf>,
}

/// Test rows for a chronological split: `ceil(0.3 * rows)`.
pub fn test_rows_for(rows: usize) -> usize {
    (3 * rows + 9) / 10
}

#[derive(Debug, Clone)]
pub struct Trainer {
    task: Task,
    store: ArtifactStore,
}

impl Trainer {
    pub fn new(task: Task, artifact_dir: impl Into<PathBuf>) -> Self {
        Self {
            task,
            store: ArtifactStore::new(artifact_dir),
        }
    }

    pub fn task(&self) -> Task {
        self.task
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Fit on the oldest 70% of rows, score on the newest 30%.
    ///
    /// With `persist`, the pipeline replaces the task's slot; otherwise the
    /// filesystem is not touched.
    pub fn train(&self, dataset: &Dataset, persist: bool) -> Result<TrainOutcome, TrainError> {
        if dataset.task() != self.task {
            return Err(TrainError::TaskMismatch {
                expected: self.task,
                got: dataset.task(),
            });
        }

        let rows = dataset.len();
        let test_rows = test_rows_for(rows);
        let train_rows = rows.saturating_sub(test_rows);
        if train_rows == 0 || test_rows == 0 {
            return Err(TrainError::SplitTooSmall { rows });
        }

        let split = ChronoSplit {
            train: split_part(dataset, 0..train_rows),
            test: split_part(dataset, train_rows..rows),
        };
        let train = dataset.slice(split.train.rows.clone());
        let test = dataset.slice(split.test.rows.clone());

        let pipeline = FittedPipeline::fit(&train)?;
        let score = pipeline.score(&test)?;

        let artifact = if persist {
            Some(self.store.save(&pipeline)?)
        } else {
            None
        };

        info!(
            task = %self.task,
            train_rows,
            test_rows,
            metric = self.task.metric_name(),
            score,
            persisted = persist,
            "training finished"
        );

        Ok(TrainOutcome {
            pipeline,
            score,
            split,
            artifact,
        })
    }

    /// Load the pipeline from this task's slot.
    pub fn load(&self) -> Result<FittedPipeline, TrainError> {
        Ok(self.store.load(self.task)?)
    }
}

fn split_part(dataset: &Dataset, rows: Range<usize>) -> SplitPart {
    SplitPart {
        timestamps: dataset.timestamps()[rows.clone()].to_vec(),
        rows,
    }
}
