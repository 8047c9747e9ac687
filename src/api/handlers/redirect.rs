//! Handlers for short URL redirect.

use axum::{
    extract::{ConnectInfo, Path, State},
    http::{HeaderMap, header},
    response::{IntoResponse, Redirect},
};
use serde_json::json;
use std::net::SocketAddr;

use crate::application::services::{Resolution, Visitor};
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::client_ip::client_ip;

/// Redirects a short code to its target URL.
///
/// # Endpoint
///
/// `GET /{code}`
///
/// # Request Flow
///
/// 1. Look the code up in the cache
/// 2. On a miss, read storage and refill the cache
/// 3. Hand a visit event to the background pipeline (never blocks)
/// 4. Return 307 Temporary Redirect
///
/// # Errors
///
/// - 404 unknown or malformed code
/// - 410 link expired
/// - 503 cache miss while storage is unreachable
pub async fn redirect_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Result<impl IntoResponse, AppError> {
    let visitor = Visitor {
        ip: Some(client_ip(&headers, addr, state.behind_proxy)),
        user_agent: headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    };

    let resolution = state.redirect_service.resolve(&code, visitor).await?;
    into_redirect(&code, resolution)
}

/// Answers `HEAD /{code}` with the status a `GET` would get, without counting
/// a visit.
pub async fn peek_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let resolution = state.redirect_service.peek(&code).await?;
    into_redirect(&code, resolution)
}

fn into_redirect(code: &str, resolution: Resolution) -> Result<Redirect, AppError> {
    match resolution {
        Resolution::Found(url) => Ok(Redirect::temporary(&url)),
        Resolution::NotFound => Err(AppError::not_found(
            "Short link not found",
            json!({ "code": code }),
        )),
        Resolution::Expired => Err(AppError::gone(
            "Short link has expired",
            json!({ "code": code }),
        )),
    }
}
