//! Handler for health check endpoint.

use axum::{Json, extract::State, http::StatusCode};

use crate::api::dto::health::{CheckStatus, HealthChecks, HealthResponse, QueueStatus};
use crate::state::AppState;

/// Returns service health status with component checks.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response Codes
///
/// - **200 OK**: All components healthy
/// - **503 Service Unavailable**: One or more components degraded
///
/// # Components Checked
///
/// 1. **Storage**: round-trip ping
/// 2. **Cache**: backend health (always ok for in-process caches)
/// 3. **Visit Queue**: pipeline still accepting events; reports depth and drops
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "checks": {
///     "storage": { "status": "ok", "message": "Connected, 12 links" },
///     "cache": { "status": "ok", "message": "Cache reachable" },
///     "visit_queue": { "status": "ok", "queued": 0, "capacity": 10000, "dropped": 0 }
///   }
/// }
/// ```
pub async fn health_handler(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let storage_check = check_storage(&state).await;

    let cache_check = check_cache(&state).await;

    let queue_check = check_visit_queue(&state);

    let all_healthy = storage_check.is_ok() && cache_check.is_ok() && queue_check.status == "ok";

    let response = HealthResponse {
        status: if all_healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks {
            storage: storage_check,
            cache: cache_check,
            visit_queue: queue_check,
        },
    };

    if all_healthy {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}

async fn check_storage(state: &AppState) -> CheckStatus {
    if let Err(e) = state.urls.ping().await {
        return CheckStatus::error(format!("Storage error: {}", e));
    }

    match state.urls.count().await {
        Ok(count) => CheckStatus::ok(format!("Connected, {} links", count)),
        Err(e) => CheckStatus::error(format!("Storage error: {}", e)),
    }
}

async fn check_cache(state: &AppState) -> CheckStatus {
    if state.cache.health_check().await {
        CheckStatus::ok("Cache reachable")
    } else {
        CheckStatus::error("Cache backend unreachable")
    }
}

fn check_visit_queue(state: &AppState) -> QueueStatus {
    let recorder = &state.visit_recorder;

    QueueStatus {
        status: if recorder.is_closed() { "error" } else { "ok" }.to_string(),
        queued: recorder.queued(),
        capacity: recorder.max_capacity(),
        dropped: recorder.dropped(),
    }
}
