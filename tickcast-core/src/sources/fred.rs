//! FRED series observations: the policy rate feed (effective federal funds rate).

use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::debug;

use super::{get_json, parse_number, SourceAdapter, SourceError};
use crate::config::FredConfig;
use crate::domain::PolicyRate;

#[derive(Debug, Deserialize)]
pub(crate) struct ObservationsResponse {
    observations: Vec<SeriesObservation>,
}

#[derive(Debug, Deserialize)]
struct SeriesObservation {
    date: String,
    value: String,
}

/// Policy rate adapter. Asks for the single most recent observation.
pub struct FredPolicyRate {
    config: FredConfig,
    client: Client,
}

impl FredPolicyRate {
    pub fn new(config: FredConfig, client: Client) -> Self {
        Self { config, client }
    }
}

impl SourceAdapter for FredPolicyRate {
    type Record = PolicyRate;

    fn name(&self) -> &str {
        "fred_policy_rate"
    }

    fn fetch(&self) -> Result<PolicyRate, SourceError> {
        let url = format!(
            "{}/series/observations",
            self.config.url.trim_end_matches('/')
        );
        let resp: ObservationsResponse = get_json(
            &self.client,
            &url,
            &[
                ("series_id", self.config.series_id.clone()),
                ("api_key", self.config.api_key.clone()),
                ("file_type", "json".to_string()),
                ("sort_order", "desc".to_string()),
                ("limit", "1".to_string()),
            ],
        )?;
        let record = latest_rate(resp)?;
        debug!(fed_rate = record.fed_rate, series = %self.config.series_id, "policy rate fetched");
        Ok(record)
    }
}

pub(crate) fn latest_rate(resp: ObservationsResponse) -> Result<PolicyRate, SourceError> {
    let obs = resp
        .observations
        .into_iter()
        .next()
        .ok_or_else(|| SourceError::ResponseFormatChanged("no series observations".into()))?;
    // FRED publishes "." for a period with no value.
    let fed_rate: f64 = parse_number(&obs.value, "value").map_err(|_| {
        SourceError::ResponseFormatChanged(format!(
            "series value for {} is missing ({:?})",
            obs.date, obs.value
        ))
    })?;
    Ok(PolicyRate { fed_rate })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_latest_observation() {
        let resp: ObservationsResponse = serde_json::from_value(json!({
            "units": "lin",
            "count": 840,
            "observations": [
                { "realtime_start": "2024-03-01", "realtime_end": "2024-03-01",
                  "date": "2024-02-01", "value": "5.33" }
            ]
        }))
        .unwrap();
        assert_eq!(latest_rate(resp).unwrap().fed_rate, 5.33);
    }

    #[test]
    fn missing_value_marker_is_rejected() {
        let resp: ObservationsResponse = serde_json::from_value(json!({
            "observations": [{ "date": "2024-03-01", "value": "." }]
        }))
        .unwrap();
        let err = latest_rate(resp).unwrap_err();
        assert!(err.to_string().contains("2024-03-01"));
    }
}
