//! Live reading source
//!
//! HTTP client for a sensor API exposing `/api/current` and `/api/history`.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;

use super::{ReadingSource, SourceError, SourceResult};
use crate::reading::Reading;

/// Configuration for the HTTP source
#[derive(Debug, Clone)]
pub struct HttpSourceConfig {
    /// Base URL of the sensor API (e.g., "http://localhost:5000")
    pub base_url: String,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
    /// Maximum number of history readings to request
    pub history_limit: usize,
}

impl Default for HttpSourceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            request_timeout_ms: 5000,
            history_limit: 50,
        }
    }
}

/// Reading source that polls a sensor API
pub struct HttpSource {
    client: Client,
    config: HttpSourceConfig,
}

impl HttpSource {
    pub fn new(config: HttpSourceConfig) -> SourceResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &HttpSourceConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> SourceResult<T> {
        let response = self.client.get(url).send().await.map_err(classify_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(classify_error)?;
        serde_json::from_slice(&body).map_err(|e| SourceError::Decode(e.to_string()))
    }
}

fn classify_error(e: reqwest::Error) -> SourceError {
    if e.is_timeout() {
        SourceError::Timeout
    } else if e.is_connect() {
        SourceError::Unavailable(e.to_string())
    } else {
        SourceError::Request(e)
    }
}

#[async_trait]
impl ReadingSource for HttpSource {
    fn name(&self) -> &str {
        "http"
    }

    async fn current(&self) -> SourceResult<Reading> {
        self.get_json(&self.url("/api/current")).await
    }

    async fn history(&self) -> SourceResult<Vec<Reading>> {
        let url = self.url(&format!("/api/history?limit={}", self.config.history_limit));
        let mut history: Vec<Reading> = self.get_json(&url).await?;

        // At most `history_limit` readings, oldest first.
        history.sort_by_key(|r| r.timestamp);
        if history.len() > self.config.history_limit {
            history.drain(..history.len() - self.config.history_limit);
        }

        Ok(history)
    }
}
