//! Binance spot klines: the price feed.
//!
//! Requests the most recent `limit` one-minute candles. Binance returns each
//! candle as a positional JSON array:
//!
//! | idx | field                        | type   |
//! |-----|------------------------------|--------|
//! | 0   | open time (ms)               | int    |
//! | 1-4 | open, high, low, close       | string |
//! | 5   | volume                       | string |
//! | 6   | close time (ms)              | int    |
//! | 7   | quote asset volume           | string |
//! | 8   | number of trades             | int    |
//! | 9   | taker buy base asset volume  | string |
//! | 10  | taker buy quote asset volume | string |

use chrono::DateTime;
use reqwest::blocking::Client;
use serde_json::Value;
use tracing::debug;

use super::{get_json, parse_number, SourceAdapter, SourceError};
use crate::config::BinanceConfig;
use crate::domain::{truncate_to_minute, Kline};

/// Price feed adapter. Returns candles oldest first; the last one is still open.
pub struct BinanceKlines {
    config: BinanceConfig,
    client: Client,
}

impl BinanceKlines {
    pub fn new(config: BinanceConfig, client: Client) -> Self {
        Self { config, client }
    }

    fn klines_url(&self) -> String {
        format!("{}/klines", self.config.url.trim_end_matches('/'))
    }
}

impl SourceAdapter for BinanceKlines {
    type Record = Vec<Kline>;

    fn name(&self) -> &str {
        "binance_klines"
    }

    fn fetch(&self) -> Result<Vec<Kline>, SourceError> {
        let rows: Vec<Vec<Value>> = get_json(
            &self.client,
            &self.klines_url(),
            &[
                ("symbol", self.config.symbol.clone()),
                ("interval", self.config.interval.clone()),
                ("limit", self.config.limit.to_string()),
            ],
        )?;
        let klines = parse_klines(&rows)?;
        debug!(count = klines.len(), symbol = %self.config.symbol, "klines fetched");
        Ok(klines)
    }
}

/// Decode positional kline rows.
pub fn parse_klines(rows: &[Vec<Value>]) -> Result<Vec<Kline>, SourceError> {
    rows.iter().map(|row| parse_kline(row)).collect()
}

fn parse_kline(row: &[Value]) -> Result<Kline, SourceError> {
    if row.len() < 11 {
        return Err(SourceError::ResponseFormatChanged(format!(
            "kline row has {} fields, expected at least 11",
            row.len()
        )));
    }

    let open_time_ms = value_i64(&row[0], "open_time")?;
    let timestamp = DateTime::from_timestamp_millis(open_time_ms)
        .map(|dt| truncate_to_minute(dt.naive_utc()))
        .ok_or_else(|| {
            SourceError::ResponseFormatChanged(format!("invalid open time: {open_time_ms}"))
        })?;

    let number_of_trades = value_i64(&row[8], "number_of_trades")?;
    let number_of_trades = u64::try_from(number_of_trades).map_err(|_| {
        SourceError::ResponseFormatChanged(format!("negative trade count: {number_of_trades}"))
    })?;

    Ok(Kline {
        timestamp,
        open: value_f64(&row[1], "open")?,
        high: value_f64(&row[2], "high")?,
        low: value_f64(&row[3], "low")?,
        close: value_f64(&row[4], "close")?,
        volume: value_f64(&row[5], "volume")?,
        quote_asset_volume: value_f64(&row[7], "quote_asset_volume")?,
        number_of_trades,
        taker_buy_base_asset_volume: value_f64(&row[9], "taker_buy_base_asset_volume")?,
        taker_buy_quote_asset_volume: value_f64(&row[10], "taker_buy_quote_asset_volume")?,
    })
}

/// Binance encodes prices as strings and counts as integers; accept either.
fn value_f64(value: &Value, field: &str) -> Result<f64, SourceError> {
    match value {
        Value::String(s) => parse_number(s, field),
        Value::Number(n) => n.as_f64().ok_or_else(|| {
            SourceError::ResponseFormatChanged(format!("field `{field}` out of range: {n}"))
        }),
        other => Err(SourceError::ResponseFormatChanged(format!(
            "field `{field}` has unexpected type: {other}"
        ))),
    }
}

fn value_i64(value: &Value, field: &str) -> Result<i64, SourceError> {
    match value {
        Value::String(s) => parse_number(s, field),
        Value::Number(n) => n.as_i64().ok_or_else(|| {
            SourceError::ResponseFormatChanged(format!("field `{field}` is not an integer: {n}"))
        }),
        other => Err(SourceError::ResponseFormatChanged(format!(
            "field `{field}` has unexpected type: {other}"
        ))),
    }
}
