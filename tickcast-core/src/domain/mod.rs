//! Domain types: the canonical observation and the per-source records it is
//! merged from.

pub mod observation;
pub mod records;

pub use observation::{
    truncate_to_minute, FeatureView, Observation, FEATURE_COUNT, FEATURE_NAMES, TARGET_LABELS,
};
pub use records::{FearGreed, Kline, MacroIndex, PolicyRate};
