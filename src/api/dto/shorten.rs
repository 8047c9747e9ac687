//! DTOs for link shortening endpoint.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use validator::Validate;

use crate::domain::entities::UrlRecord;

/// Compiled regex for custom code validation.
static CUSTOM_CODE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());

/// Request to shorten a URL.
#[derive(Debug, Deserialize, Validate)]
pub struct ShortenRequest {
    /// The original URL to shorten (must be valid HTTP/HTTPS).
    #[validate(url(message = "Invalid URL format"))]
    pub url: String,

    /// Optional custom short code. Reserved route words are rejected later.
    #[validate(length(min = 3, max = 20))]
    #[validate(regex(path = "*CUSTOM_CODE_REGEX"))]
    pub custom_code: Option<String>,

    /// Optional expiry timestamp. After this time, the link returns 410 Gone.
    pub expires_at: Option<DateTime<Utc>>,
}

/// A freshly created short link.
#[derive(Debug, Serialize)]
pub struct ShortenResponse {
    pub code: String,
    pub short_url: String,
    pub target_url: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl ShortenResponse {
    pub fn new(record: UrlRecord, short_url: String) -> Self {
        Self {
            code: record.code,
            short_url,
            target_url: record.target_url,
            created_at: record.created_at,
            expires_at: record.expires_at,
        }
    }
}
