//! Application error type and its HTTP mapping.
//!
//! Every fallible operation in the service layer returns [`AppError`]. Handlers
//! propagate it with `?` and axum renders it through [`IntoResponse`] as:
//!
//! ```json
//! { "error": { "code": "conflict", "message": "...", "details": { } } }
//! ```
//!
//! Resolver outcomes such as "not found" and "expired" are not errors inside the
//! service layer (see [`crate::application::services::Resolution`]); they are
//! converted into [`AppError::NotFound`] / [`AppError::Gone`] only at the HTTP edge.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorInfo,
}

/// Serializable error payload.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorInfo {
    pub code: &'static str,
    pub message: String,
    pub details: Value,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Rejected input: bad URL, bad custom code, bad expiry or query.
    #[error("{message}")]
    Validation { message: String, details: Value },

    #[error("{message}")]
    NotFound { message: String, details: Value },

    /// The short link exists but has expired.
    #[error("{message}")]
    Gone { message: String, details: Value },

    /// A caller-supplied custom code is already taken.
    #[error("{message}")]
    Conflict { message: String, details: Value },

    /// Every generated candidate collided; the caller may retry later.
    #[error("{message}")]
    AllocationExhausted { message: String, details: Value },

    /// The storage layer could not be reached.
    #[error("{message}")]
    StorageUnavailable { message: String, details: Value },

    #[error("{message}")]
    Internal { message: String, details: Value },
}

impl AppError {
    pub fn bad_request(message: impl Into<String>, details: Value) -> Self {
        Self::Validation {
            message: message.into(),
            details,
        }
    }
    pub fn not_found(message: impl Into<String>, details: Value) -> Self {
        Self::NotFound {
            message: message.into(),
            details,
        }
    }
    pub fn gone(message: impl Into<String>, details: Value) -> Self {
        Self::Gone {
            message: message.into(),
            details,
        }
    }
    pub fn conflict(message: impl Into<String>, details: Value) -> Self {
        Self::Conflict {
            message: message.into(),
            details,
        }
    }
    pub fn allocation_exhausted(attempts: u32) -> Self {
        Self::AllocationExhausted {
            message: "Failed to allocate a unique short code".to_string(),
            details: json!({ "attempts": attempts }),
        }
    }
    pub fn storage_unavailable(message: impl Into<String>, details: Value) -> Self {
        Self::StorageUnavailable {
            message: message.into(),
            details,
        }
    }
    pub fn internal(message: impl Into<String>, details: Value) -> Self {
        Self::Internal {
            message: message.into(),
            details,
        }
    }

    /// HTTP status and machine-readable code for this error.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Validation { .. } => (StatusCode::BAD_REQUEST, "validation_error"),
            AppError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Gone { .. } => (StatusCode::GONE, "expired"),
            AppError::Conflict { .. } => (StatusCode::CONFLICT, "conflict"),
            AppError::AllocationExhausted { .. } => (StatusCode::CONFLICT, "allocation_exhausted"),
            AppError::StorageUnavailable { .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, "storage_unavailable")
            }
            AppError::Internal { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }

    pub fn to_error_info(&self) -> ErrorInfo {
        let (_, code) = self.status_and_code();
        let (message, details) = match self {
            AppError::Validation { message, details }
            | AppError::NotFound { message, details }
            | AppError::Gone { message, details }
            | AppError::Conflict { message, details }
            | AppError::AllocationExhausted { message, details }
            | AppError::StorageUnavailable { message, details }
            | AppError::Internal { message, details } => (message.clone(), details.clone()),
        };

        ErrorInfo {
            code,
            message,
            details,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, _) = self.status_and_code();

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "{}", self);
        }

        let body = ErrorBody {
            error: self.to_error_info(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => AppError::conflict(
                "Unique constraint violation",
                json!({ "constraint": db.constraint() }),
            ),
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => {
                AppError::storage_unavailable("Storage unavailable", json!({ "reason": e.to_string() }))
            }
            _ => AppError::internal("Database error", json!({ "reason": e.to_string() })),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let fields = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let messages: Vec<String> = errs
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| e.code.to_string())
                    })
                    .collect();
                (field.to_string(), json!(messages))
            })
            .collect::<serde_json::Map<_, _>>();

        AppError::bad_request("Request validation failed", Value::Object(fields))
    }
}
