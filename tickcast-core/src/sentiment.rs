//! Hosted sentiment model client.
//!
//! Sends one or more texts to a serverless text-classification endpoint and
//! returns, per input, the score of each sentiment label.

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::{HfConfig, HttpConfig, ProxyConfig};
use crate::sources::{build_client, read_json, SourceError};

#[derive(Debug, Error)]
pub enum SentimentError {
    #[error("sentiment request: {0}")]
    Request(#[from] SourceError),

    #[error("sentiment model reported: {0}")]
    Model(String),

    #[error("sentiment request has no input text")]
    EmptyInput,
}

/// Text(s) to classify.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SentimentInputs {
    One(String),
    Many(Vec<String>),
}

impl SentimentInputs {
    pub fn len(&self) -> usize {
        match self {
            Self::One(_) => 1,
            Self::Many(texts) => texts.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Inference options. Both flags default to on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentOptions {
    /// Serve cached results for repeated inputs.
    pub use_cache: bool,
    /// Block until a cold model has loaded instead of failing fast.
    pub wait_for_model: bool,
}

impl Default for SentimentOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            wait_for_model: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentRequest {
    pub inputs: SentimentInputs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<SentimentOptions>,
}

impl SentimentRequest {
    pub fn one(text: impl Into<String>) -> Self {
        Self {
            inputs: SentimentInputs::One(text.into()),
            options: None,
        }
    }

    pub fn many(texts: Vec<String>) -> Self {
        Self {
            inputs: SentimentInputs::Many(texts),
            options: None,
        }
    }

    pub fn with_options(mut self, options: SentimentOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// The request as sent on the wire: options always present.
    fn resolved(mut self) -> Self {
        self.options.get_or_insert_with(SentimentOptions::default);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    #[serde(alias = "LABEL_0", alias = "NEGATIVE")]
    Negative,
    #[serde(alias = "LABEL_1", alias = "NEUTRAL")]
    Neutral,
    #[serde(alias = "LABEL_2", alias = "POSITIVE")]
    Positive,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentScore {
    pub label: SentimentLabel,
    pub score: f64,
}

/// Highest-scoring label of one input's scores.
pub fn dominant(scores: &[SentimentScore]) -> Option<SentimentScore> {
    scores
        .iter()
        .copied()
        .max_by(|a, b| a.score.total_cmp(&b.score))
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApiReply {
    Scores(Vec<Vec<SentimentScore>>),
    Error { error: String },
}

pub struct SentimentClient {
    url: String,
    token: String,
    client: Client,
}

impl SentimentClient {
    /// Build a client. Requests go through the configured proxies.
    pub fn new(
        hf: &HfConfig,
        http: &HttpConfig,
        proxies: Option<&ProxyConfig>,
    ) -> Result<Self, SentimentError> {
        Ok(Self {
            url: hf.sentiment_url.clone(),
            token: hf.sentiment_token.clone(),
            client: build_client(http, proxies)?,
        })
    }

    /// Classify the request's inputs; one score list per input, in input order.
    pub fn query(
        &self,
        request: SentimentRequest,
    ) -> Result<Vec<Vec<SentimentScore>>, SentimentError> {
        if request.inputs.is_empty() {
            return Err(SentimentError::EmptyInput);
        }
        let request = request.resolved();
        debug!(inputs = request.inputs.len(), options = ?request.options, "sentiment query");

        let resp = self
            .client
            .post(&self.url)
            .header(reqwest::header::AUTHORIZATION, self.token.as_str())
            .json(&request)
            .send()
            .map_err(|e| SourceError::NetworkUnreachable(e.to_string()))?;

        match read_json::<ApiReply>(resp, &self.url)? {
            ApiReply::Scores(scores) => Ok(scores),
            ApiReply::Error { error } => Err(SentimentError::Model(error)),
        }
    }
}
