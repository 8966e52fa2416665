//! Source adapter trait, structured error types and the concrete feeds.
//!
//! Each upstream feed is wrapped in a [`SourceAdapter`] returning one typed
//! record per call. Adapters hold only immutable configuration and their own
//! HTTP client, so they can be fetched concurrently without coordination.
//! Nothing here retries: a failed fetch surfaces to the assembler as-is.

pub mod binance;
pub mod fng;
pub mod fred;
pub mod yahoo;

pub use binance::BinanceKlines;
pub use fng::FearGreedIndex;
pub use fred::FredPolicyRate;
pub use yahoo::YahooDxy;

use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::{AppConfig, HttpConfig, ProxyConfig};
use crate::domain::{FearGreed, Kline, MacroIndex, PolicyRate};

/// Structured error for a single feed's fetch.
///
/// Displayable in CLI output; carried inside
/// [`AcquisitionError`](crate::observe::AcquisitionError) when an assembly
/// cycle aborts.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("HTTP client setup failed: {0}")]
    ClientSetup(String),

    #[error("adapter was never dispatched")]
    NotDispatched,
}

/// An upstream feed producing one typed record per call.
pub trait SourceAdapter: Send + Sync {
    type Record: Send;

    /// Short stable name used in logs and error reports.
    fn name(&self) -> &str;

    /// Fetch the feed's current value(s).
    fn fetch(&self) -> Result<Self::Record, SourceError>;
}

/// The four feeds an observation is assembled from.
pub struct SourceSet {
    pub price: Box<dyn SourceAdapter<Record = Vec<Kline>>>,
    pub macro_index: Box<dyn SourceAdapter<Record = MacroIndex>>,
    pub sentiment: Box<dyn SourceAdapter<Record = FearGreed>>,
    pub policy_rate: Box<dyn SourceAdapter<Record = PolicyRate>>,
}

impl SourceSet {
    /// Number of adapters dispatched per assembly cycle.
    pub const LEN: usize = 4;

    /// Build the production HTTP adapters from configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, SourceError> {
        let proxies = config.proxies.as_ref();
        Ok(Self {
            // Binance rejects proxied requests, so its client never gets one.
            price: Box::new(BinanceKlines::new(
                config.binance.clone(),
                build_client(&config.http, None)?,
            )),
            macro_index: Box::new(YahooDxy::new(
                config.yahoo.clone(),
                build_client(&config.http, proxies)?,
            )),
            sentiment: Box::new(FearGreedIndex::new(
                config.fng.clone(),
                build_client(&config.http, proxies)?,
            )),
            policy_rate: Box::new(FredPolicyRate::new(
                config.fred.clone(),
                build_client(&config.http, proxies)?,
            )),
        })
    }
}

/// Build a blocking HTTP client with the shared transport settings.
pub fn build_client(http: &HttpConfig, proxies: Option<&ProxyConfig>) -> Result<Client, SourceError> {
    let mut builder = Client::builder()
        .timeout(Duration::from_secs(http.timeout_secs))
        .user_agent(http.user_agent.as_str());

    if let Some(proxies) = proxies {
        if let Some(url) = &proxies.http {
            let proxy =
                reqwest::Proxy::http(url).map_err(|e| SourceError::ClientSetup(e.to_string()))?;
            builder = builder.proxy(proxy);
        }
        if let Some(url) = &proxies.https {
            let proxy =
                reqwest::Proxy::https(url).map_err(|e| SourceError::ClientSetup(e.to_string()))?;
            builder = builder.proxy(proxy);
        }
    }

    builder
        .build()
        .map_err(|e| SourceError::ClientSetup(e.to_string()))
}

/// GET a JSON document, mapping transport and status failures to [`SourceError`].
pub(crate) fn get_json<T: DeserializeOwned>(
    client: &Client,
    url: &str,
    query: &[(&str, String)],
) -> Result<T, SourceError> {
    debug!(url, "GET");
    let resp = client
        .get(url)
        .query(query)
        .send()
        .map_err(|e| SourceError::NetworkUnreachable(e.to_string()))?;
    read_json(resp, url)
}

/// Map the response status to [`SourceError`] and decode a JSON body.
pub(crate) fn read_json<T: DeserializeOwned>(
    resp: reqwest::blocking::Response,
    url: &str,
) -> Result<T, SourceError> {
    let status = resp.status();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = resp
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(60);
        return Err(SourceError::RateLimited { retry_after_secs });
    }
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(SourceError::AuthenticationRequired(format!("HTTP {status} from {url}")));
    }
    if !status.is_success() {
        return Err(SourceError::HttpStatus {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    resp.json::<T>().map_err(|e| {
        SourceError::ResponseFormatChanged(format!("failed to parse response from {url}: {e}"))
    })
}

/// Parse a numeric string field, naming it in the error.
pub(crate) fn parse_number<T: std::str::FromStr>(raw: &str, field: &str) -> Result<T, SourceError>
where
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| {
        SourceError::ResponseFormatChanged(format!("field `{field}` = {raw:?} is not numeric: {e}"))
    })
}
