//! Observation: one merged snapshot of every tracked signal.

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Observation fields predicted by the models rather than used as inputs.
pub const TARGET_LABELS: [&str; 3] = ["high", "low", "close"];

/// Feature columns in matrix order: every field except the timestamp and the
/// target labels.
pub const FEATURE_NAMES: [&str; 9] = [
    "open",
    "volume",
    "quote_asset_volume",
    "number_of_trades",
    "taker_buy_base_asset_volume",
    "taker_buy_quote_asset_volume",
    "open_dxy",
    "fng",
    "fed_rate",
];

pub const FEATURE_COUNT: usize = FEATURE_NAMES.len();

/// Canonical snapshot of the price feed's last closed minute candle plus the
/// macro, sentiment and policy-rate values current at assembly time.
///
/// The timestamp is the candle's open time in UTC, truncated to the minute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub quote_asset_volume: f64,
    pub number_of_trades: u64,
    pub taker_buy_base_asset_volume: f64,
    pub taker_buy_quote_asset_volume: f64,
    pub open_dxy: f64,
    pub fng: i64,
    pub fed_rate: f64,
}

/// Feature values of one observation, keyed by its timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureView {
    pub timestamp: NaiveDateTime,
    pub values: [f64; FEATURE_COUNT],
}

impl FeatureView {
    /// Iterate `(name, value)` pairs in feature order.
    pub fn named(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        FEATURE_NAMES.iter().copied().zip(self.values.iter().copied())
    }
}

impl Observation {
    /// Feature values in [`FEATURE_NAMES`] order.
    pub fn features(&self) -> [f64; FEATURE_COUNT] {
        [
            self.open,
            self.volume,
            self.quote_asset_volume,
            self.number_of_trades as f64,
            self.taker_buy_base_asset_volume,
            self.taker_buy_quote_asset_volume,
            self.open_dxy,
            self.fng as f64,
            self.fed_rate,
        ]
    }

    /// Target values in [`TARGET_LABELS`] order.
    pub fn targets(&self) -> [f64; 3] {
        [self.high, self.low, self.close]
    }

    /// All fields except the target labels, indexed by timestamp.
    pub fn feature_view(&self) -> FeatureView {
        FeatureView {
            timestamp: self.timestamp,
            values: self.features(),
        }
    }

    /// Close minus open for the anchored candle.
    pub fn open_close_delta(&self) -> f64 {
        self.close - self.open
    }

    /// True when the timestamp has zero seconds and zero sub-seconds.
    pub fn is_minute_aligned(&self) -> bool {
        self.timestamp.second() == 0 && self.timestamp.nanosecond() == 0
    }

    /// True when every float field is finite.
    pub fn is_finite(&self) -> bool {
        self.features().iter().all(|v| v.is_finite())
            && self.targets().iter().all(|v| v.is_finite())
    }
}

/// Drop seconds and sub-seconds from a timestamp.
pub fn truncate_to_minute(ts: NaiveDateTime) -> NaiveDateTime {
    ts.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(ts)
}
