//! Observation assembler: concurrent fan-out over every source adapter,
//! barrier join, then a single validated merge.
//!
//! The assembler owns a private rayon pool (never the global one) sized to
//! the adapter count plus headroom, so one slow feed never queues behind
//! another. `ThreadPool::scope` only returns once every spawned fetch has
//! settled; a cycle with any failed adapter produces no observation.

pub mod merge;

pub use merge::{anchor_candle, merge_records, MergeError, MergeInto, ObservationDraft};

use std::fmt;
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::{FearGreed, Kline, MacroIndex, Observation, PolicyRate};
use crate::history::{HistoryError, ObservationHistory};
use crate::sources::{SourceAdapter, SourceError, SourceSet};

/// One adapter's failure within an assembly cycle.
#[derive(Debug)]
pub struct AdapterFailure {
    pub adapter: String,
    pub error: SourceError,
}

impl fmt::Display for AdapterFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.adapter, self.error)
    }
}

/// Why an assembly cycle produced no observation.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("{} adapter(s) failed: {}", .0.len(), join_failures(.0))]
    AdapterFailures(Vec<AdapterFailure>),

    #[error("inconsistent merge: {0}")]
    InconsistentMerge(#[from] MergeError),

    #[error("failed to build fetch pool: {0}")]
    WorkerPool(String),
}

impl AcquisitionError {
    /// Names of the adapters that failed, empty for non-adapter errors.
    pub fn failed_adapters(&self) -> Vec<&str> {
        match self {
            Self::AdapterFailures(failures) => {
                failures.iter().map(|f| f.adapter.as_str()).collect()
            }
            _ => Vec::new(),
        }
    }
}

fn join_failures(failures: &[AdapterFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Error from [`record_observation`]: either no observation, or it could not be stored.
#[derive(Debug, Error)]
pub enum ObserveError {
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    #[error(transparent)]
    History(#[from] HistoryError),
}

/// Runs the source adapters and merges their records.
pub struct ObservationAssembler {
    sources: SourceSet,
    pool: rayon::ThreadPool,
}

impl ObservationAssembler {
    /// Extra pool threads beyond one per adapter.
    pub const DEFAULT_HEADROOM: usize = 1;

    pub fn new(sources: SourceSet) -> Result<Self, AcquisitionError> {
        Self::with_headroom(sources, Self::DEFAULT_HEADROOM)
    }

    pub fn with_headroom(sources: SourceSet, headroom: usize) -> Result<Self, AcquisitionError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(SourceSet::LEN + headroom)
            .thread_name(|i| format!("tickcast-fetch-{i}"))
            .build()
            .map_err(|e| AcquisitionError::WorkerPool(e.to_string()))?;
        Ok(Self { sources, pool })
    }

    /// Pool size in threads.
    pub fn pool_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Fetch every feed concurrently and merge the results.
    ///
    /// All adapters are awaited even when one fails early, so the error lists
    /// every failure of the cycle.
    pub fn observe(&self) -> Result<Observation, AcquisitionError> {
        let started = Instant::now();
        let sources = &self.sources;

        let mut price: Result<Vec<Kline>, SourceError> = Err(SourceError::NotDispatched);
        let mut macro_index: Result<MacroIndex, SourceError> = Err(SourceError::NotDispatched);
        let mut sentiment: Result<FearGreed, SourceError> = Err(SourceError::NotDispatched);
        let mut policy_rate: Result<PolicyRate, SourceError> = Err(SourceError::NotDispatched);

        self.pool.scope(|s| {
            s.spawn(|_| price = timed_fetch(sources.price.as_ref()));
            s.spawn(|_| macro_index = timed_fetch(sources.macro_index.as_ref()));
            s.spawn(|_| sentiment = timed_fetch(sources.sentiment.as_ref()));
            s.spawn(|_| policy_rate = timed_fetch(sources.policy_rate.as_ref()));
        });

        let mut failures = Vec::new();
        let price = settle(&mut failures, sources.price.name(), price);
        let macro_index = settle(&mut failures, sources.macro_index.name(), macro_index);
        let sentiment = settle(&mut failures, sources.sentiment.name(), sentiment);
        let policy_rate = settle(&mut failures, sources.policy_rate.name(), policy_rate);

        let observation = match (price, macro_index, sentiment, policy_rate) {
            (Some(candles), Some(m), Some(f), Some(p)) if failures.is_empty() => {
                merge_records(candles, m, f, p)?
            }
            _ => {
                warn!(
                    failed = failures.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "assembly cycle aborted"
                );
                return Err(AcquisitionError::AdapterFailures(failures));
            }
        };

        info!(
            timestamp = %observation.timestamp,
            close = observation.close,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "observation assembled"
        );
        Ok(observation)
    }
}

fn timed_fetch<R: Send>(adapter: &dyn SourceAdapter<Record = R>) -> Result<R, SourceError> {
    let started = Instant::now();
    debug!(adapter = adapter.name(), "fetch start");
    let result = adapter.fetch();
    let elapsed_ms = started.elapsed().as_millis() as u64;
    match &result {
        Ok(_) => debug!(adapter = adapter.name(), elapsed_ms, "fetch ok"),
        Err(e) => warn!(adapter = adapter.name(), elapsed_ms, error = %e, "fetch failed"),
    }
    result
}

fn settle<R>(
    failures: &mut Vec<AdapterFailure>,
    adapter: &str,
    result: Result<R, SourceError>,
) -> Option<R> {
    match result {
        Ok(record) => Some(record),
        Err(error) => {
            failures.push(AdapterFailure {
                adapter: adapter.to_string(),
                error,
            });
            None
        }
    }
}

/// Assemble one observation and append it to history.
///
/// History is only touched after a successful assembly.
pub fn record_observation(
    assembler: &ObservationAssembler,
    history: &ObservationHistory,
) -> Result<Observation, ObserveError> {
    let observation = assembler.observe()?;
    history.append(&observation)?;
    Ok(observation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_display_names_adapter() {
        let err = AcquisitionError::AdapterFailures(vec![
            AdapterFailure {
                adapter: "binance_klines".into(),
                error: SourceError::RateLimited {
                    retry_after_secs: 30,
                },
            },
            AdapterFailure {
                adapter: "fred_policy_rate".into(),
                error: SourceError::AuthenticationRequired("bad key".into()),
            },
        ]);
        let msg = err.to_string();
        assert!(msg.starts_with("2 adapter(s) failed"), "{msg}");
        assert!(msg.contains("binance_klines: rate limited"), "{msg}");
        assert!(msg.contains("fred_policy_rate"), "{msg}");
        assert_eq!(err.failed_adapters(), vec!["binance_klines", "fred_policy_rate"]);
    }

    #[test]
    fn merge_error_converts() {
        let err: AcquisitionError = MergeError::MissingField("fng").into();
        assert!(matches!(
            err,
            AcquisitionError::InconsistentMerge(MergeError::MissingField("fng"))
        ));
        assert!(err.failed_adapters().is_empty());
    }

    struct Fixed(Option<PolicyRate>);

    impl SourceAdapter for Fixed {
        type Record = PolicyRate;

        fn name(&self) -> &str {
            "fixed"
        }

        fn fetch(&self) -> Result<PolicyRate, SourceError> {
            self.0.ok_or(SourceError::NotDispatched)
        }
    }

    #[test]
    fn timed_fetch_passes_result_through() {
        let ok: Box<dyn SourceAdapter<Record = PolicyRate>> =
            Box::new(Fixed(Some(PolicyRate { fed_rate: 4.5 })));
        assert_eq!(timed_fetch(ok.as_ref()).unwrap().fed_rate, 4.5);

        let failing: Box<dyn SourceAdapter<Record = PolicyRate>> =
            Box::new(Fixed(None));
        assert!(matches!(
            timed_fetch(failing.as_ref()),
            Err(SourceError::NotDispatched)
        ));
    }
}
