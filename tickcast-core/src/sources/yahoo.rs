//! Yahoo Finance chart API: the macro index feed (US dollar index).
//!
//! Fetches the last few daily bars of the configured index and reports the
//! opening value of the most recent day that has one. Yahoo has no official
//! API and is subject to unannounced format changes; every missing piece of
//! the payload is reported as [`SourceError::ResponseFormatChanged`].

use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::debug;

use super::{get_json, SourceAdapter, SourceError};
use crate::config::YahooConfig;
use crate::domain::MacroIndex;

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
pub(crate) struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    open: Vec<Option<f64>>,
}

/// Macro index adapter.
pub struct YahooDxy {
    config: YahooConfig,
    client: Client,
}

impl YahooDxy {
    pub fn new(config: YahooConfig, client: Client) -> Self {
        Self { config, client }
    }

    fn chart_url(&self) -> String {
        format!(
            "{}/v8/finance/chart/{}",
            self.config.url.trim_end_matches('/'),
            self.config.dxy_symbol
        )
    }
}

impl SourceAdapter for YahooDxy {
    type Record = MacroIndex;

    fn name(&self) -> &str {
        "yahoo_dxy"
    }

    fn fetch(&self) -> Result<MacroIndex, SourceError> {
        let chart: ChartResponse = get_json(
            &self.client,
            &self.chart_url(),
            &[("interval", "1d".to_string()), ("range", "5d".to_string())],
        )?;
        let open_dxy = latest_open(&self.config.dxy_symbol, chart)?;
        debug!(open_dxy, symbol = %self.config.dxy_symbol, "macro index fetched");
        Ok(MacroIndex { open_dxy })
    }
}

/// Opening value of the latest bar that has one.
pub(crate) fn latest_open(symbol: &str, resp: ChartResponse) -> Result<f64, SourceError> {
    let result = resp.chart.result.ok_or_else(|| match resp.chart.error {
        Some(err) => {
            SourceError::ResponseFormatChanged(format!("{symbol}: {}: {}", err.code, err.description))
        }
        None => SourceError::ResponseFormatChanged("empty result with no error".into()),
    })?;

    let data = result
        .into_iter()
        .next()
        .ok_or_else(|| SourceError::ResponseFormatChanged("result array is empty".into()))?;

    let quote = data
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| SourceError::ResponseFormatChanged("no quote data".into()))?;

    // Holidays and the not-yet-open session come back as nulls.
    quote
        .open
        .into_iter()
        .rev()
        .flatten()
        .find(|v| v.is_finite())
        .ok_or_else(|| SourceError::ResponseFormatChanged(format!("{symbol}: no opening value")))
}
