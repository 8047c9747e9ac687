//! API route configuration.

use crate::api::handlers::{
    health_handler, peek_handler, redirect_handler, shorten_handler, stats_handler,
};
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};

/// All service routes. None require authentication.
///
/// # Endpoints
///
/// - `POST /shorten`        - Create a short link
/// - `GET  /stats/{code}`   - Visit statistics for a link
/// - `GET  /health`         - Component health
/// - `GET  /{code}`         - Redirect (records a visit)
/// - `HEAD /{code}`         - Redirect status without recording a visit
///
/// Static segments take priority over `/{code}`, which is why those words are
/// reserved for custom codes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/shorten", post(shorten_handler))
        .route("/stats/{code}", get(stats_handler))
        .route("/health", get(health_handler))
        .route("/{code}", get(redirect_handler).head(peek_handler))
}
