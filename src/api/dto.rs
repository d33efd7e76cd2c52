//! Data Transfer Objects
//!
//! Request and response types for the API endpoints that are not plain
//! domain types. Readings and statistics are serialized directly.

use serde::{Deserialize, Serialize};

/// Query parameters for `/api/history` and `/api/statistics`
#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
    /// Number of most recent readings (default from config)
    pub limit: Option<usize>,
}

/// Query parameters for `/api/export`
#[derive(Debug, Deserialize)]
pub struct ExportParams {
    /// One of 24h, 7d, 30d, all
    #[serde(default = "default_range")]
    pub range: String,
}

fn default_range() -> String {
    "all".to_string()
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub storage: String,
    pub readings: usize,
    pub uptime_seconds: u64,
    pub version: String,
}
