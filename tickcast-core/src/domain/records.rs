//! Source records: the typed output of each source adapter.
//!
//! Each record owns a disjoint subset of the [`Observation`](super::Observation)
//! fields. Records are created fresh on every fetch and consumed by the merge.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One minute candle from the price feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kline {
    /// Candle open time (UTC), truncated to the minute.
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
}

/// Opening value of the dollar index for its latest trading day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacroIndex {
    pub open_dxy: f64,
}

/// Crypto Fear & Greed index reading (0 = extreme fear, 100 = extreme greed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FearGreed {
    pub fng: i64,
}

/// Latest effective policy rate, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolicyRate {
    pub fed_rate: f64,
}
