//! Observation history: append-only CSV store.
//!
//! One row per observation, header = observation field names. Rows are
//! appended as they are assembled; [`ObservationHistory::load`] returns them
//! ascending by timestamp with at most one row per timestamp.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::Observation;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history I/O on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("history CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// CSV file of observations.
#[derive(Debug, Clone)]
pub struct ObservationHistory {
    path: PathBuf,
}

impl ObservationHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one observation, creating the file (with header) and its parent
    /// directories on first use.
    pub fn append(&self, observation: &Observation) -> Result<(), HistoryError> {
        self.append_all(std::slice::from_ref(observation))
    }

    /// Append several observations in order.
    pub fn append_all(&self, observations: &[Observation]) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
            }
        }

        let needs_header = match fs::metadata(&self.path) {
            Ok(meta) => meta.len() == 0,
            Err(e) if e.kind() == io::ErrorKind::NotFound => true,
            Err(e) => return Err(self.io_err(e)),
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_err(e))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        for observation in observations {
            writer.serialize(observation)?;
        }
        writer.flush().map_err(|e| self.io_err(e))?;

        debug!(path = %self.path.display(), rows = observations.len(), "history appended");
        Ok(())
    }

    /// Load every stored observation, ascending by timestamp.
    ///
    /// A missing file is an empty history. When two rows share a timestamp the
    /// later one in the file wins. Malformed rows fail the whole load.
    pub fn load(&self) -> Result<Vec<Observation>, HistoryError> {
        let file = match fs::File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_err(e)),
        };

        let mut reader = csv::Reader::from_reader(file);
        let mut rows: Vec<Observation> = reader
            .deserialize()
            .collect::<Result<Vec<Observation>, csv::Error>>()?;

        // Stable: rows sharing a timestamp keep their file order.
        rows.sort_by_key(|o| o.timestamp);

        let mut observations: Vec<Observation> = Vec::with_capacity(rows.len());
        for row in rows {
            match observations.last_mut() {
                Some(prev) if prev.timestamp == row.timestamp => {
                    warn!(timestamp = %row.timestamp, "duplicate history row, keeping the later one");
                    *prev = row;
                }
                _ => observations.push(row),
            }
        }

        debug!(path = %self.path.display(), rows = observations.len(), "history loaded");
        Ok(observations)
    }

    fn io_err(&self, source: io::Error) -> HistoryError {
        HistoryError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    fn ts(minute: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + Duration::minutes(minute)
    }

    fn obs(minute: i64, close: f64) -> Observation {
        Observation {
            timestamp: ts(minute),
            open: 100.0,
            high: close.max(100.0) + 0.5,
            low: close.min(100.0) - 0.5,
            close,
            volume: 1.25,
            quote_asset_volume: 125.000_000_1,
            number_of_trades: 7,
            taker_buy_base_asset_volume: 0.6,
            taker_buy_quote_asset_volume: 60.3,
            open_dxy: 103.91,
            fng: 48,
            fed_rate: 5.33,
        }
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let history = ObservationHistory::new(dir.path().join("none.csv"));
        assert!(history.load().unwrap().is_empty());
    }

    #[test]
    fn append_then_load_preserves_values() {
        let dir = tempfile::tempdir().unwrap();
        let history = ObservationHistory::new(dir.path().join("nested/obs.csv"));
        let a = obs(0, 101.0);
        let b = obs(1, 99.5);
        history.append(&a).unwrap();
        history.append(&b).unwrap();

        let loaded = history.load().unwrap();
        assert_eq!(loaded, vec![a, b]);
    }

    #[test]
    fn header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("obs.csv");
        let history = ObservationHistory::new(&path);
        history.append(&obs(0, 1.0)).unwrap();
        history.append(&obs(1, 2.0)).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.matches("timestamp").count(), 1);
        assert!(text.starts_with("timestamp,open,high,low,close"));
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn load_sorts_ascending() {
        let dir = tempfile::tempdir().unwrap();
        let history = ObservationHistory::new(dir.path().join("obs.csv"));
        history
            .append_all(&[obs(5, 1.0), obs(2, 2.0), obs(9, 3.0)])
            .unwrap();
        let minutes: Vec<NaiveDateTime> =
            history.load().unwrap().iter().map(|o| o.timestamp).collect();
        assert_eq!(minutes, vec![ts(2), ts(5), ts(9)]);
    }

    #[test]
    fn duplicate_timestamp_keeps_later_row() {
        let dir = tempfile::tempdir().unwrap();
        let history = ObservationHistory::new(dir.path().join("obs.csv"));
        history
            .append_all(&[obs(1, 10.0), obs(2, 20.0), obs(1, 11.0)])
            .unwrap();
        let loaded = history.load().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].close, 11.0);
        assert_eq!(loaded[1].close, 20.0);
    }

    #[test]
    fn malformed_row_fails_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("obs.csv");
        let history = ObservationHistory::new(&path);
        history.append(&obs(0, 1.0)).unwrap();
        let mut text = fs::read_to_string(&path).unwrap();
        text.push_str("2024-03-01T00:01:00,not-a-number,1,1,1,1,1,1,1,1,1,1,1\n");
        fs::write(&path, text).unwrap();

        assert!(matches!(history.load(), Err(HistoryError::Csv(_))));
    }
}
