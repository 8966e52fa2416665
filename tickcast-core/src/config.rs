//! Application configuration.
//!
//! Loaded once from a TOML document at process start and passed by reference to
//! every component that needs it. Unknown keys and missing required keys are
//! load-time errors.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from loading or validating the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("parse config: {0}")]
    Parse(String),

    #[error("invalid config value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Complete application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub binance: BinanceConfig,
    pub yahoo: YahooConfig,
    pub fng: FngConfig,
    pub fred: FredConfig,
    pub hf: HfConfig,
    #[serde(default)]
    pub proxies: Option<ProxyConfig>,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Binance spot klines endpoint (price feed).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BinanceConfig {
    pub url: String,
    #[serde(default = "default_symbol")]
    pub symbol: String,
    #[serde(default = "default_interval")]
    pub interval: String,
    /// Number of candles requested. The last one is still in progress.
    #[serde(default = "default_kline_limit")]
    pub limit: u32,
}

/// Yahoo Finance chart endpoint (macro index feed).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct YahooConfig {
    pub url: String,
    #[serde(default = "default_dxy_symbol")]
    pub dxy_symbol: String,
}

/// Fear & Greed index endpoint (sentiment index feed).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FngConfig {
    pub url: String,
}

/// FRED series endpoint (policy rate feed).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FredConfig {
    pub url: String,
    pub api_key: String,
    #[serde(default = "default_fred_series")]
    pub series_id: String,
}

/// Hosted sentiment model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct HfConfig {
    pub sentiment_url: String,
    pub sentiment_token: String,
}

/// Outbound proxies. Never applied to the Binance feed, whose WAF rejects them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ProxyConfig {
    #[serde(default)]
    pub http: Option<String>,
    #[serde(default)]
    pub https: Option<String>,
}

/// Transport settings shared by every HTTP client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

/// Where observations and model artifacts live.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    #[serde(default = "default_history_path")]
    pub history_path: PathBuf,
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            history_path: default_history_path(),
            artifact_dir: default_artifact_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// `tracing` filter directive; `RUST_LOG` takes precedence.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_symbol() -> String {
    "BTCUSDT".to_string()
}

fn default_interval() -> String {
    "1m".to_string()
}

fn default_kline_limit() -> u32 {
    2
}

fn default_dxy_symbol() -> String {
    "DX-Y.NYB".to_string()
}

fn default_fred_series() -> String {
    "FEDFUNDS".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string()
}

fn default_history_path() -> PathBuf {
    PathBuf::from("data/observations.csv")
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from("models")
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load and validate a configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would only fail later, at fetch time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let urls = [
            ("binance.url", &self.binance.url),
            ("yahoo.url", &self.yahoo.url),
            ("fng.url", &self.fng.url),
            ("fred.url", &self.fred.url),
            ("hf.sentiment_url", &self.hf.sentiment_url),
        ];
        for (field, url) in urls {
            if url.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must not be empty".into(),
                });
            }
        }
        if self.binance.limit < 2 {
            return Err(ConfigError::Invalid {
                field: "binance.limit",
                reason: format!(
                    "{} candles leave no closed candle to anchor on (need at least 2)",
                    self.binance.limit
                ),
            });
        }
        if self.http.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "http.timeout_secs",
                reason: "must be positive".into(),
            });
        }
        Ok(())
    }
}
