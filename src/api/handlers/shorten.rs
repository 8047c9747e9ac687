//! Handler for link shortening endpoint.

use axum::{Json, extract::State, http::StatusCode};
use validator::Validate;

use crate::api::dto::shorten::{ShortenRequest, ShortenResponse};
use crate::application::services::CreateLink;
use crate::error::AppError;
use crate::state::AppState;

/// Creates a short link.
///
/// # Endpoint
///
/// `POST /shorten`
///
/// # Request Body
///
/// ```json
/// {
///   "url": "https://example.com/some/long/path",
///   "custom_code": "promo1",               // optional
///   "expires_at": "2030-01-01T00:00:00Z"   // optional
/// }
/// ```
///
/// # Response
///
/// `201 Created`
///
/// ```json
/// {
///   "code": "aB3dE9x",
///   "short_url": "https://s.example.com/aB3dE9x",
///   "target_url": "https://example.com/some/long/path",
///   "created_at": "2025-01-01T12:00:00Z",
///   "expires_at": null
/// }
/// ```
///
/// # Errors
///
/// - 400 invalid URL, custom code or expiry
/// - 409 custom code taken, or no free code found within the retry budget
/// - 503 storage unavailable
pub async fn shorten_handler(
    State(state): State<AppState>,
    Json(payload): Json<ShortenRequest>,
) -> Result<(StatusCode, Json<ShortenResponse>), AppError> {
    payload.validate()?;

    let record = state
        .link_service
        .create_short_link(CreateLink {
            target_url: payload.url,
            custom_code: payload.custom_code,
            expires_at: payload.expires_at,
        })
        .await?;

    let short_url = state.link_service.short_url(&record.code);

    Ok((
        StatusCode::CREATED,
        Json(ShortenResponse::new(record, short_url)),
    ))
}
