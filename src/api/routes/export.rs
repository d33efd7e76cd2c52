//! Export Routes
//!
//! - GET /api/export?range=24h|7d|30d|all - Stored readings as a CSV attachment

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use std::sync::Arc;

use crate::api::dto::ExportParams;
use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::export::{export_filename, filter_by_range, to_csv, ExportError, ExportRange, ExportRow};

/// GET /api/export
///
/// Refuses with 404 `EMPTY_EXPORT` when no reading falls in the range.
pub async fn export_csv(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ExportParams>,
) -> ApiResult<Response> {
    let range: ExportRange = params.range.parse()?;
    let now = Utc::now();

    let readings = state.store.since(range.cutoff(now)).await?;
    let rows = filter_by_range(&ExportRow::from_history(&readings), range, now);
    if rows.is_empty() {
        return Err(ExportError::EmptyResult { range }.into());
    }

    let body = to_csv(&rows)?;
    let filename = export_filename(range, now);

    tracing::info!(range = %range, rows = rows.len(), "Serving CSV export");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
        .into_response())
}
