//! Short link creation and retrieval.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::domain::entities::{NewUrlRecord, UrlRecord};
use crate::domain::repositories::{InsertOutcome, UrlRepository};
use crate::error::AppError;
use crate::infrastructure::cache::CacheService;
use crate::utils::code_generator::{CodeGenerator, ShortCode};
use crate::utils::url_normalizer::normalize_url;

/// Default number of generated candidates tried before giving up.
pub const MAX_ALLOCATION_RETRIES: u32 = 5;

/// A request to create a short link.
#[derive(Debug, Clone, Default)]
pub struct CreateLink {
    pub target_url: String,
    pub custom_code: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl CreateLink {
    pub fn new(target_url: impl Into<String>) -> Self {
        Self {
            target_url: target_url.into(),
            ..Self::default()
        }
    }
}

/// Service for creating and retrieving shortened links.
///
/// Allocation never reads before writing: every candidate goes straight to
/// [`UrlRepository::insert_if_absent`], and the storage uniqueness constraint
/// decides the winner when writers race for the same code.
pub struct LinkService {
    urls: Arc<dyn UrlRepository>,
    cache: Arc<dyn CacheService>,
    generator: Arc<dyn CodeGenerator>,
    base_url: String,
    cache_ttl: Duration,
    max_attempts: u32,
}

impl LinkService {
    pub fn new(
        urls: Arc<dyn UrlRepository>,
        cache: Arc<dyn CacheService>,
        generator: Arc<dyn CodeGenerator>,
        base_url: impl Into<String>,
        cache_ttl: Duration,
        max_attempts: u32,
    ) -> Self {
        Self {
            urls,
            cache,
            generator,
            base_url: base_url.into(),
            cache_ttl,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Creates a short link.
    ///
    /// # Code allocation
    ///
    /// - With `custom_code`: validated, then inserted once. A taken code is a
    ///   [`AppError::Conflict`]; it is never retried.
    /// - Otherwise up to `max_attempts` generated candidates are tried, each with
    ///   one conditional insert.
    ///
    /// The same URL submitted twice gets two distinct codes.
    ///
    /// # Errors
    ///
    /// - [`AppError::Validation`] - invalid URL, custom code or expiry
    /// - [`AppError::Conflict`] - custom code already taken
    /// - [`AppError::AllocationExhausted`] - every generated candidate collided
    /// - [`AppError::StorageUnavailable`] - storage unreachable
    pub async fn create_short_link(&self, request: CreateLink) -> Result<UrlRecord, AppError> {
        let target_url = normalize_url(&request.target_url).map_err(|e| {
            AppError::bad_request("Invalid URL format", json!({ "reason": e.to_string() }))
        })?;

        let now = Utc::now();
        if let Some(expires_at) = request.expires_at
            && expires_at <= now
        {
            return Err(AppError::bad_request(
                "expires_at must be in the future",
                json!({ "expires_at": expires_at.to_rfc3339() }),
            ));
        }

        let record = match request.custom_code {
            Some(custom) => {
                let code = ShortCode::parse_custom(&custom)?;
                self.insert_custom(code, target_url, request.expires_at)
                    .await?
            }
            None => self.allocate(target_url, request.expires_at).await?,
        };

        info!(code = %record.code, "Short link created");
        self.prime_cache(&record).await;

        Ok(record)
    }

    async fn insert_custom(
        &self,
        code: ShortCode,
        target_url: String,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<UrlRecord, AppError> {
        let new_record = NewUrlRecord {
            code: code.into_inner(),
            target_url,
            expires_at,
        };
        let code = new_record.code.clone();

        match self.urls.insert_if_absent(new_record).await? {
            InsertOutcome::Inserted(record) => Ok(record),
            InsertOutcome::Conflict => Err(AppError::conflict(
                "Custom code already exists",
                json!({ "code": code }),
            )),
        }
    }

    async fn allocate(
        &self,
        target_url: String,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<UrlRecord, AppError> {
        for attempt in 1..=self.max_attempts {
            let new_record = NewUrlRecord {
                code: self.generator.generate().into_inner(),
                target_url: target_url.clone(),
                expires_at,
            };
            let code = new_record.code.clone();

            match self.urls.insert_if_absent(new_record).await? {
                InsertOutcome::Inserted(record) => return Ok(record),
                InsertOutcome::Conflict => {
                    metrics::counter!("allocation_collisions_total").increment(1);
                    debug!(code = %code, attempt, "Generated code collided, retrying");
                }
            }
        }

        metrics::counter!("allocation_exhausted_total").increment(1);
        warn!(
            attempts = self.max_attempts,
            "Short code allocation exhausted its retry budget"
        );
        Err(AppError::allocation_exhausted(self.max_attempts))
    }

    /// Warms the cache so the first redirect skips storage. Failures only cost
    /// that one cache miss.
    async fn prime_cache(&self, record: &UrlRecord) {
        let Some(ttl) = record.cache_ttl(self.cache_ttl, Utc::now()) else {
            return;
        };

        if let Err(e) = self
            .cache
            .set_url(&record.code, &record.target_url, Some(ttl))
            .await
        {
            warn!(code = %record.code, "Failed to prime cache: {}", e);
        }
    }

    /// Retrieves a link by its short code, expired or not.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no link has this code.
    pub async fn get_link_by_code(&self, code: &str) -> Result<UrlRecord, AppError> {
        self.urls
            .find_by_code(code)
            .await?
            .ok_or_else(|| AppError::not_found("Short link not found", json!({ "code": code })))
    }

    /// Full short URL for a code: `{base_url}/{code}`.
    pub fn short_url(&self, code: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), code)
    }
}
