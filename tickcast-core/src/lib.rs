//! Tickcast Core: source adapters, observation assembly, history store.
//!
//! This crate contains everything needed to produce observations:
//! - Domain types (the canonical observation and per-source records)
//! - TOML configuration
//! - Blocking HTTP adapters for the price, macro, sentiment and policy-rate feeds
//! - Concurrent assembler merging one fetch cycle into an observation
//! - CSV observation history
//! - Hosted sentiment model client
//! - Synthetic histories and logging setup

pub mod config;
pub mod domain;
pub mod history;
pub mod logging;
pub mod observe;
pub mod sentiment;
pub mod sources;
pub mod synthetic;

pub use config::{AppConfig, ConfigError};
pub use domain::{Observation, FEATURE_COUNT, FEATURE_NAMES, TARGET_LABELS};
pub use history::{HistoryError, ObservationHistory};
pub use observe::{
    record_observation, AcquisitionError, AdapterFailure, ObservationAssembler, ObserveError,
};
pub use sources::{SourceAdapter, SourceError, SourceSet};
