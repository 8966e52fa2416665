//! Tickcast Runner: datasets, walk-forward evaluation, training, persistence.
//!
//! This crate builds on `tickcast-core` to provide:
//! - Dataset building from an observation history (regression or direction task)
//! - Standard scaling and the linear / logistic baseline estimators
//! - Forward-chaining walk-forward evaluation with an expanding window
//! - Chronological train/test training with atomic artifact persistence

pub mod artifact;
pub mod dataset;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod scaler;
pub mod trainer;
pub mod walk_forward;

pub use artifact::{slot_file, ArtifactError, ArtifactStore};
pub use dataset::{Dataset, DatasetError, Direction, Targets, Task};
pub use model::{Estimator, ModelError};
pub use pipeline::{FittedPipeline, PipelineMetadata, Prediction};
pub use scaler::StandardScaler;
pub use trainer::{ChronoSplit, SplitPart, TrainError, TrainOutcome, Trainer};
pub use walk_forward::{
    create_folds, evaluate, evaluate_with, mean_score, FoldScore, FoldSpec, WalkForwardConfig,
    WalkForwardError,
};
