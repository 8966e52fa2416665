//! Field merge: typed records into one validated [`Observation`].
//!
//! Every record type writes only the draft fields it owns; the namespaces are
//! disjoint by construction, so there is nothing to resolve at merge time.
//! [`ObservationDraft::finish`] is the single completeness check.

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::domain::{truncate_to_minute, FearGreed, Kline, MacroIndex, Observation, PolicyRate};

/// Structural inconsistency found while merging source records.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MergeError {
    #[error("price feed returned {received} candle(s); need at least 2 to anchor on a closed one")]
    NoClosedCandle { received: usize },

    #[error("required field `{0}` was not populated by any source")]
    MissingField(&'static str),

    #[error("field `{0}` is not a finite number")]
    NonFinite(&'static str),
}

/// A record that contributes its fields to an observation draft.
pub trait MergeInto {
    fn merge_into(self, draft: &mut ObservationDraft);
}

/// Observation under construction. All fields start unset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationDraft {
    timestamp: Option<NaiveDateTime>,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<f64>,
    quote_asset_volume: Option<f64>,
    number_of_trades: Option<u64>,
    taker_buy_base_asset_volume: Option<f64>,
    taker_buy_quote_asset_volume: Option<f64>,
    open_dxy: Option<f64>,
    fng: Option<i64>,
    fed_rate: Option<f64>,
}

impl ObservationDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one record into the draft.
    pub fn with(mut self, record: impl MergeInto) -> Self {
        record.merge_into(&mut self);
        self
    }

    /// Validate completeness and build the observation. Every float field
    /// must be finite.
    pub fn finish(self) -> Result<Observation, MergeError> {
        fn need<T>(value: Option<T>, name: &'static str) -> Result<T, MergeError> {
            value.ok_or(MergeError::MissingField(name))
        }
        fn real(value: Option<f64>, name: &'static str) -> Result<f64, MergeError> {
            let v = need(value, name)?;
            if v.is_finite() {
                Ok(v)
            } else {
                Err(MergeError::NonFinite(name))
            }
        }

        Ok(Observation {
            timestamp: truncate_to_minute(need(self.timestamp, "timestamp")?),
            open: real(self.open, "open")?,
            high: real(self.high, "high")?,
            low: real(self.low, "low")?,
            close: real(self.close, "close")?,
            volume: real(self.volume, "volume")?,
            quote_asset_volume: real(self.quote_asset_volume, "quote_asset_volume")?,
            number_of_trades: need(self.number_of_trades, "number_of_trades")?,
            taker_buy_base_asset_volume: real(
                self.taker_buy_base_asset_volume,
                "taker_buy_base_asset_volume",
            )?,
            taker_buy_quote_asset_volume: real(
                self.taker_buy_quote_asset_volume,
                "taker_buy_quote_asset_volume",
            )?,
            open_dxy: real(self.open_dxy, "open_dxy")?,
            fng: need(self.fng, "fng")?,
            fed_rate: real(self.fed_rate, "fed_rate")?,
        })
    }
}

impl MergeInto for Kline {
    fn merge_into(self, draft: &mut ObservationDraft) {
        draft.timestamp = Some(self.timestamp);
        draft.open = Some(self.open);
        draft.high = Some(self.high);
        draft.low = Some(self.low);
        draft.close = Some(self.close);
        draft.volume = Some(self.volume);
        draft.quote_asset_volume = Some(self.quote_asset_volume);
        draft.number_of_trades = Some(self.number_of_trades);
        draft.taker_buy_base_asset_volume = Some(self.taker_buy_base_asset_volume);
        draft.taker_buy_quote_asset_volume = Some(self.taker_buy_quote_asset_volume);
    }
}

impl MergeInto for MacroIndex {
    fn merge_into(self, draft: &mut ObservationDraft) {
        draft.open_dxy = Some(self.open_dxy);
    }
}

impl MergeInto for FearGreed {
    fn merge_into(self, draft: &mut ObservationDraft) {
        draft.fng = Some(self.fng);
    }
}

impl MergeInto for PolicyRate {
    fn merge_into(self, draft: &mut ObservationDraft) {
        draft.fed_rate = Some(self.fed_rate);
    }
}

/// Pick the most recently closed candle.
///
/// The feed returns candles oldest first with the still-forming current minute
/// last, so the anchor is the second-to-last element.
pub fn anchor_candle(candles: Vec<Kline>) -> Result<Kline, MergeError> {
    let received = candles.len();
    if received < 2 {
        return Err(MergeError::NoClosedCandle { received });
    }
    candles
        .into_iter()
        .nth(received - 2)
        .ok_or(MergeError::NoClosedCandle { received })
}

/// Merge one fetch cycle's records into an observation.
pub fn merge_records(
    candles: Vec<Kline>,
    macro_index: MacroIndex,
    sentiment: FearGreed,
    policy_rate: PolicyRate,
) -> Result<Observation, MergeError> {
    let anchor = anchor_candle(candles)?;
    ObservationDraft::new()
        .with(anchor)
        .with(macro_index)
        .with(sentiment)
        .with(policy_rate)
        .finish()
}
