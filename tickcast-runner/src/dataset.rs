//! Historical dataset: observations pooled into an ordered feature matrix and
//! per-task targets.
//!
//! Rows are ascending by timestamp and never reordered. The only way to take
//! part of a dataset is a contiguous [`Dataset::slice`].

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use chrono::NaiveDateTime;
use ndarray::{s, Array2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tickcast_core::domain::{Observation, FEATURE_COUNT, FEATURE_NAMES, TARGET_LABELS};

#[derive(Debug, Error, PartialEq)]
pub enum DatasetError {
    #[error("no observations to build a dataset from")]
    Empty,

    #[error("duplicate observation timestamp {0}")]
    DuplicateTimestamp(NaiveDateTime),

    #[error("observation at {0} has a non-finite value")]
    NonFinite(NaiveDateTime),
}

/// Learning task. Each task has its own estimator family and artifact slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    /// Predict `high`, `low` and `close`.
    Regression,
    /// Predict the candle direction.
    Classification,
}

impl Task {
    pub const ALL: [Task; 2] = [Task::Regression, Task::Classification];

    pub fn as_str(self) -> &'static str {
        match self {
            Task::Regression => "regression",
            Task::Classification => "classification",
        }
    }

    /// Name of the metric [`crate::metrics::score`] reports for this task.
    pub fn metric_name(self) -> &'static str {
        match self {
            Task::Regression => "r2",
            Task::Classification => "accuracy",
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Task {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "regression" | "lr" => Ok(Task::Regression),
            "classification" | "lgr" => Ok(Task::Classification),
            other => Err(format!(
                "unknown task {other:?} (expected regression or classification)"
            )),
        }
    }
}

/// Sign of close minus open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    Down,
    Flat,
    Up,
}

impl Direction {
    pub const COUNT: usize = 3;
    pub const ALL: [Direction; 3] = [Direction::Down, Direction::Flat, Direction::Up];

    pub fn from_delta(delta: f64) -> Self {
        if delta < 0.0 {
            Direction::Down
        } else if delta > 0.0 {
            Direction::Up
        } else {
            Direction::Flat
        }
    }

    pub fn of(observation: &Observation) -> Self {
        Self::from_delta(observation.open_close_delta())
    }

    /// Class index used by the classifier: Down 0, Flat 1, Up 2.
    pub fn index(self) -> usize {
        match self {
            Direction::Down => 0,
            Direction::Flat => 1,
            Direction::Up => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Direction::Down => "down",
            Direction::Flat => "flat",
            Direction::Up => "up",
        };
        f.write_str(label)
    }
}

/// Per-row targets, shaped by the task.
#[derive(Debug, Clone, PartialEq)]
pub enum Targets {
    /// One row per observation, columns `high, low, close`.
    Regression(Array2<f64>),
    Classification(Vec<Direction>),
}

impl Targets {
    pub fn len(&self) -> usize {
        match self {
            Targets::Regression(y) => y.nrows(),
            Targets::Classification(y) => y.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn task(&self) -> Task {
        match self {
            Targets::Regression(_) => Task::Regression,
            Targets::Classification(_) => Task::Classification,
        }
    }

    fn slice(&self, rows: Range<usize>) -> Targets {
        match self {
            Targets::Regression(y) => Targets::Regression(y.slice(s![rows, ..]).to_owned()),
            Targets::Classification(y) => Targets::Classification(y[rows].to_vec()),
        }
    }
}

/// Ordered feature matrix plus targets for one task.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    timestamps: Vec<NaiveDateTime>,
    features: Array2<f64>,
    targets: Targets,
}

impl Dataset {
    /// Build a dataset from observations, ascending by timestamp.
    ///
    /// Input order does not matter; duplicate timestamps are rejected rather
    /// than silently dropped.
    pub fn build(observations: &[Observation], task: Task) -> Result<Self, DatasetError> {
        if observations.is_empty() {
            return Err(DatasetError::Empty);
        }

        let mut ordered: Vec<&Observation> = observations.iter().collect();
        ordered.sort_by_key(|o| o.timestamp);

        for pair in ordered.windows(2) {
            if pair[0].timestamp == pair[1].timestamp {
                return Err(DatasetError::DuplicateTimestamp(pair[1].timestamp));
            }
        }
        if let Some(bad) = ordered.iter().find(|o| !o.is_finite()) {
            return Err(DatasetError::NonFinite(bad.timestamp));
        }

        let rows = ordered.len();
        let timestamps = ordered.iter().map(|o| o.timestamp).collect();
        let features = Array2::from_shape_fn((rows, FEATURE_COUNT), |(i, j)| {
            ordered[i].features()[j]
        });
        let targets = match task {
            Task::Regression => Targets::Regression(Array2::from_shape_fn(
                (rows, TARGET_LABELS.len()),
                |(i, j)| ordered[i].targets()[j],
            )),
            Task::Classification => {
                Targets::Classification(ordered.iter().map(|o| Direction::of(o)).collect())
            }
        };

        Ok(Self {
            timestamps,
            features,
            targets,
        })
    }

    pub fn task(&self) -> Task {
        self.targets.task()
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn features(&self) -> &Array2<f64> {
        &self.features
    }

    pub fn targets(&self) -> &Targets {
        &self.targets
    }

    pub fn feature_names(&self) -> &'static [&'static str] {
        &FEATURE_NAMES
    }

    /// Contiguous rows `[start, end)`, clamped to the dataset.
    pub fn slice(&self, rows: Range<usize>) -> Dataset {
        let end = rows.end.min(self.len());
        let start = rows.start.min(end);
        Dataset {
            timestamps: self.timestamps[start..end].to_vec(),
            features: self.features.slice(s![start..end, ..]).to_owned(),
            targets: self.targets.slice(start..end),
        }
    }

    pub fn into_parts(self) -> (Vec<NaiveDateTime>, Array2<f64>, Targets) {
        (self.timestamps, self.features, self.targets)
    }

    /// BLAKE3 digest of task, timestamps, features and targets, hex-encoded.
    pub fn content_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.task().as_str().as_bytes());
        hasher.update(&(self.len() as u64).to_le_bytes());
        for ts in &self.timestamps {
            hasher.update(&ts.and_utc().timestamp_millis().to_le_bytes());
        }
        for v in self.features.iter() {
            hasher.update(&v.to_le_bytes());
        }
        match &self.targets {
            Targets::Regression(y) => {
                for v in y.iter() {
                    hasher.update(&v.to_le_bytes());
                }
            }
            Targets::Classification(y) => {
                for d in y {
                    hasher.update(&[d.index() as u8]);
                }
            }
        }
        hasher.finalize().to_hex().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickcast_core::synthetic::{generate_history, rising_history};

    #[test]
    fn direction_from_delta() {
        assert_eq!(Direction::from_delta(-0.5), Direction::Down);
        assert_eq!(Direction::from_delta(0.0), Direction::Flat);
        assert_eq!(Direction::from_delta(2.0), Direction::Up);
    }

    #[test]
    fn direction_index_roundtrip() {
        for d in Direction::ALL {
            assert_eq!(Direction::from_index(d.index()), Some(d));
        }
        assert_eq!(Direction::from_index(3), None);
    }

    #[test]
    fn task_parses_aliases() {
        assert_eq!("regression".parse::<Task>().unwrap(), Task::Regression);
        assert_eq!("LGR".parse::<Task>().unwrap(), Task::Classification);
        assert!("forest".parse::<Task>().is_err());
    }

    #[test]
    fn rows_are_sorted_regardless_of_input_order() {
        let mut history = generate_history(20, 3);
        history.reverse();
        let ds = Dataset::build(&history, Task::Regression).unwrap();
        assert!(ds.timestamps().windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn feature_and_target_rows_align() {
        let history = generate_history(15, 5);
        let ds = Dataset::build(&history, Task::Regression).unwrap();
        let (timestamps, x, targets) = ds.into_parts();
        let Targets::Regression(y) = targets else {
            panic!("expected regression targets");
        };
        for (i, obs) in history.iter().enumerate() {
            assert_eq!(timestamps[i], obs.timestamp);
            assert_eq!(x.row(i).to_vec(), obs.features().to_vec());
            assert_eq!(y.row(i).to_vec(), obs.targets().to_vec());
        }
        assert_eq!(x.ncols(), FEATURE_COUNT);
        assert_eq!(y.ncols(), 3);
    }

    #[test]
    fn rising_series_is_all_up() {
        let ds = Dataset::build(&rising_history(10), Task::Classification).unwrap();
        match ds.targets() {
            Targets::Classification(y) => assert!(y.iter().all(|d| *d == Direction::Up)),
            other => panic!("unexpected targets {other:?}"),
        }
    }

    #[test]
    fn empty_is_rejected() {
        assert_eq!(
            Dataset::build(&[], Task::Regression).unwrap_err(),
            DatasetError::Empty
        );
    }

    #[test]
    fn duplicate_timestamp_is_rejected() {
        let mut history = generate_history(5, 1);
        history[3].timestamp = history[1].timestamp;
        let err = Dataset::build(&history, Task::Classification).unwrap_err();
        assert_eq!(err, DatasetError::DuplicateTimestamp(history[1].timestamp));
    }

    #[test]
    fn non_finite_is_rejected() {
        let mut history = generate_history(5, 1);
        history[2].open_dxy = f64::NAN;
        assert!(matches!(
            Dataset::build(&history, Task::Regression),
            Err(DatasetError::NonFinite(_))
        ));
    }

    #[test]
    fn slice_is_contiguous() {
        let history = generate_history(30, 9);
        let ds = Dataset::build(&history, Task::Classification).unwrap();
        let part = ds.slice(10..20);
        assert_eq!(part.len(), 10);
        assert_eq!(part.timestamps()[0], history[10].timestamp);
        assert_eq!(part.timestamps()[9], history[19].timestamp);
        assert_eq!(part.targets().len(), 10);
        assert_eq!(ds.slice(25..99).len(), 5);
    }

    #[test]
    fn content_hash_tracks_content() {
        let history = generate_history(25, 2);
        let a = Dataset::build(&history, Task::Regression).unwrap();
        let b = Dataset::build(&history, Task::Regression).unwrap();
        let c = Dataset::build(&history, Task::Classification).unwrap();
        let d = Dataset::build(&history[..24], Task::Regression).unwrap();
        assert_eq!(a.content_hash(), b.content_hash());
        assert_ne!(a.content_hash(), c.content_hash());
        assert_ne!(a.content_hash(), d.content_hash());
        assert_eq!(a.content_hash().len(), 64);
    }
}
