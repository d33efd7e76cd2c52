//! Health Routes
//!
//! Health check endpoints for monitoring.
//!
//! - GET /health/live - Liveness probe (process is alive)
//! - GET /health/ready - Readiness probe (store reachable)
//! - GET /health - Full health status

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::HealthResponse;
use crate::api::state::AppState;

/// GET /health/live
///
/// Returns 200 if the process is alive, no dependency checks.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// GET /health/ready
///
/// Returns 200 if the reading store answers queries.
pub async fn readiness(State(state): State<Arc<AppState>>) -> StatusCode {
    if state.store.ping().await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /health
pub async fn full_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let readings = state.store.count().await;

    let (status, storage) = match &readings {
        Ok(_) => ("healthy", "ok"),
        Err(e) => {
            tracing::warn!("Health check: store unavailable: {}", e);
            ("unhealthy", "error")
        }
    };

    Json(HealthResponse {
        status: status.to_string(),
        storage: storage.to_string(),
        readings: readings.unwrap_or(0),
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
