//! alternative.me Crypto Fear & Greed index: the sentiment index feed.

use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::debug;

use super::{get_json, parse_number, SourceAdapter, SourceError};
use crate::config::FngConfig;
use crate::domain::FearGreed;

#[derive(Debug, Deserialize)]
pub(crate) struct FngResponse {
    data: Vec<FngEntry>,
}

#[derive(Debug, Deserialize)]
struct FngEntry {
    value: String,
}

/// Sentiment index adapter.
pub struct FearGreedIndex {
    config: FngConfig,
    client: Client,
}

impl FearGreedIndex {
    pub fn new(config: FngConfig, client: Client) -> Self {
        Self { config, client }
    }
}

impl SourceAdapter for FearGreedIndex {
    type Record = FearGreed;

    fn name(&self) -> &str {
        "fear_greed"
    }

    fn fetch(&self) -> Result<FearGreed, SourceError> {
        let url = format!("{}/fng/", self.config.url.trim_end_matches('/'));
        let resp: FngResponse = get_json(&self.client, &url, &[("limit", "1".to_string())])?;
        let record = latest_reading(resp)?;
        debug!(fng = record.fng, "fear & greed fetched");
        Ok(record)
    }
}

pub(crate) fn latest_reading(resp: FngResponse) -> Result<FearGreed, SourceError> {
    let entry = resp
        .data
        .into_iter()
        .next()
        .ok_or_else(|| SourceError::ResponseFormatChanged("fear & greed data is empty".into()))?;
    let fng: i64 = parse_number(&entry.value, "value")?;
    if !(0..=100).contains(&fng) {
        return Err(SourceError::ResponseFormatChanged(format!(
            "fear & greed value {fng} outside 0..=100"
        )));
    }
    Ok(FearGreed { fng })
}
