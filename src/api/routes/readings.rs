//! Reading Routes
//!
//! - GET /api/current - Take a reading, store it, return it
//! - GET /api/history - Latest stored readings, oldest first
//! - GET /api/statistics - Averages over the latest stored readings

use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;

use crate::api::dto::HistoryParams;
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::reading::Reading;
use crate::stats::{aggregate, Statistics};

/// GET /api/current
pub async fn current_reading(State(state): State<Arc<AppState>>) -> ApiResult<Json<Reading>> {
    let reading = state.sensor.current().await?;
    let stored = state.store.insert(reading).await?;

    tracing::debug!(id = ?stored.id, "Stored new reading");
    Ok(Json(stored))
}

/// GET /api/history
pub async fn history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoryParams>,
) -> ApiResult<Json<Vec<Reading>>> {
    let limit = resolve_limit(&state, params.limit)?;
    Ok(Json(state.store.latest(limit).await?))
}

/// GET /api/statistics
pub async fn statistics(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoryParams>,
) -> ApiResult<Json<Statistics>> {
    let limit = resolve_limit(&state, params.limit)?;
    let history = state.store.latest(limit).await?;

    aggregate(&history)
        .map(Json)
        .map_err(|e| ApiError::NotFound(e.to_string()))
}

fn resolve_limit(state: &AppState, requested: Option<usize>) -> ApiResult<usize> {
    let limit = requested.unwrap_or(state.config.history_limit);
    if limit == 0 || limit > state.config.max_history_limit {
        return Err(ApiError::Validation(format!(
            "limit must be between 1 and {}",
            state.config.max_history_limit
        )));
    }
    Ok(limit)
}
