//! Handler for link statistics.

use axum::{
    Json,
    extract::{Path, Query, State},
};

use crate::api::dto::stats::{StatsQuery, StatsResponse};
use crate::error::AppError;
use crate::state::AppState;

/// Returns visit statistics for a short link.
///
/// # Endpoint
///
/// `GET /stats/{code}?days=7`
///
/// # Query Parameters
///
/// - `days` (optional) - include per-day counts for the last N days (1-365)
///
/// # Response
///
/// ```json
/// {
///   "code": "aB3dE9x",
///   "target_url": "https://example.com/",
///   "created_at": "2025-01-01T12:00:00Z",
///   "expires_at": null,
///   "visit_count": 42,
///   "last_visited_at": "2025-01-02T08:30:00Z",
///   "daily": [{ "day": "2025-01-02", "count": 42 }]
/// }
/// ```
///
/// Counts lag live traffic by up to one pipeline flush interval.
///
/// # Errors
///
/// - 400 `days` out of range
/// - 404 unknown code
pub async fn stats_handler(
    Path(code): Path<String>,
    Query(query): Query<StatsQuery>,
    State(state): State<AppState>,
) -> Result<Json<StatsResponse>, AppError> {
    let stats = state.stats_service.get_stats(&code, query.days).await?;
    Ok(Json(stats.into()))
}
