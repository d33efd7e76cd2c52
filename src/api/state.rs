//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use std::sync::Arc;
use std::time::Instant;

use crate::source::ReadingSource;
use crate::storage::ReadingStore;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Persistent reading store
    pub store: ReadingStore,
    /// Sensor that produces readings for `/api/current`
    pub sensor: Arc<dyn ReadingSource>,
    /// API configuration
    pub config: Arc<ApiConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    pub fn new(store: ReadingStore, sensor: Arc<dyn ReadingSource>, config: ApiConfig) -> Self {
        Self {
            store,
            sensor,
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Default number of readings returned by history and statistics
    pub history_limit: usize,
    /// Upper bound on a requested history limit
    pub max_history_limit: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            history_limit: 50,
            max_history_limit: 1000,
        }
    }
}

impl ApiConfig {
    /// Create config with custom host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl From<&crate::config::ApiSettings> for ApiConfig {
    fn from(settings: &crate::config::ApiSettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
            history_limit: settings.history_limit,
            ..Default::default()
        }
    }
}
