//! Reading Sources
//!
//! A reading source produces the current reading and a bounded history of
//! past readings. Two implementations exist:
//! - `HttpSource`: polls a sensor API over HTTP
//! - `SyntheticSource`: generates plausible random readings locally
//!
//! The implementation is chosen once, at construction, by [`build_source`].

mod http;
mod synthetic;

pub use http::{HttpSource, HttpSourceConfig};
pub use synthetic::{SyntheticConfig, SyntheticSource};

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

use crate::reading::Reading;

/// Common trait for everything that produces readings
#[async_trait]
pub trait ReadingSource: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Fetch the current reading
    async fn current(&self) -> SourceResult<Reading>;

    /// Fetch past readings, oldest first
    async fn history(&self) -> SourceResult<Vec<Reading>>;
}

/// Which source implementation to construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    Live,
    Synthetic,
}

impl std::str::FromStr for SourceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "live" | "http" => Ok(SourceMode::Live),
            "synthetic" | "mock" | "demo" => Ok(SourceMode::Synthetic),
            other => Err(format!("unknown source mode: {}", other)),
        }
    }
}

/// Errors that can occur while fetching readings
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Sensor source unavailable: {0}")]
    Unavailable(String),

    #[error("Sensor source timed out")]
    Timeout,

    #[error("Sensor source returned HTTP {0}")]
    Status(u16),

    #[error("Invalid sensor payload: {0}")]
    Decode(String),

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Sensor generator failed: {0}")]
    Generator(String),
}

/// Result type alias for source operations
pub type SourceResult<T> = Result<T, SourceError>;

/// Construct the configured reading source
pub fn build_source(config: &crate::config::SourceConfig) -> SourceResult<Arc<dyn ReadingSource>> {
    match config.mode {
        SourceMode::Live => {
            let source = HttpSource::new(HttpSourceConfig {
                base_url: config.base_url.clone(),
                request_timeout_ms: config.request_timeout_ms,
                history_limit: config.history_limit,
            })?;
            tracing::info!("Using live reading source at {}", config.base_url);
            Ok(Arc::new(source))
        }
        SourceMode::Synthetic => {
            let source = SyntheticSource::new(SyntheticConfig {
                history_len: config.history_limit,
                spacing_secs: config.synthetic.spacing_secs,
                latency_ms: config.synthetic.latency_ms,
                failure_rate: config.synthetic.failure_rate,
                seed: config.synthetic.seed,
                light: config.synthetic.light_min..=config.synthetic.light_max,
            });
            tracing::info!("Using synthetic reading source");
            Ok(Arc::new(source))
        }
    }
}
