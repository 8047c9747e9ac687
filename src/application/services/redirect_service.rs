//! Redirect resolution: cache first, storage on miss, visit hand-off.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};

use crate::domain::entities::VisitEvent;
use crate::domain::repositories::UrlRepository;
use crate::domain::visit_pipeline::VisitRecorder;
use crate::error::AppError;
use crate::infrastructure::cache::{CacheLookup, CacheService};
use crate::utils::code_generator::ShortCode;

/// Outcome of resolving a short code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(String),
    NotFound,
    /// The link exists but its `expires_at` has passed.
    Expired,
}

/// Who followed the link.
#[derive(Debug, Clone, Default)]
pub struct Visitor {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

pub struct RedirectService {
    urls: Arc<dyn UrlRepository>,
    cache: Arc<dyn CacheService>,
    visits: VisitRecorder,
    cache_ttl: Duration,
    negative_cache_ttl: Duration,
}

impl RedirectService {
    /// `negative_cache_ttl == 0` disables negative caching.
    pub fn new(
        urls: Arc<dyn UrlRepository>,
        cache: Arc<dyn CacheService>,
        visits: VisitRecorder,
        cache_ttl: Duration,
        negative_cache_ttl: Duration,
    ) -> Self {
        Self {
            urls,
            cache,
            visits,
            cache_ttl,
            negative_cache_ttl,
        }
    }

    /// Resolves a code and records the visit.
    ///
    /// Every well-formed code is handed to the pipeline whatever the outcome,
    /// storage errors included. Malformed codes resolve to `NotFound` and are
    /// not recorded. Recording never blocks and never fails the redirect.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::StorageUnavailable`] when the cache misses and storage
    /// cannot be reached.
    pub async fn resolve(&self, code: &str, visitor: Visitor) -> Result<Resolution, AppError> {
        let Some(code) = Self::parse(code) else {
            return Ok(Resolution::NotFound);
        };

        let resolution = self.lookup(code.as_str()).await;

        self.visits
            .record(VisitEvent::new(code.into_inner(), visitor.ip, visitor.user_agent));

        resolution
    }

    /// Same lookup as [`Self::resolve`] without recording a visit.
    pub async fn peek(&self, code: &str) -> Result<Resolution, AppError> {
        match Self::parse(code) {
            Some(code) => self.lookup(code.as_str()).await,
            None => Ok(Resolution::NotFound),
        }
    }

    fn parse(code: &str) -> Option<ShortCode> {
        ShortCode::parse(code)
            .inspect_err(|_| debug!(code = %code.escape_debug(), "Rejected malformed short code"))
            .ok()
    }

    /// `code` must already be a valid [`ShortCode`].
    async fn lookup(&self, code: &str) -> Result<Resolution, AppError> {
        match self.cache.get_url(code).await {
            Ok(CacheLookup::Hit(url)) => {
                metrics::counter!("cache_hits_total").increment(1);
                return Ok(Resolution::Found(url));
            }
            Ok(CacheLookup::NotFound) => {
                metrics::counter!("cache_hits_total").increment(1);
                return Ok(Resolution::NotFound);
            }
            Ok(CacheLookup::Miss) => {}
            Err(e) => warn!(code = %code, "Cache lookup failed, falling back to storage: {}", e),
        }
        metrics::counter!("cache_misses_total").increment(1);

        let Some(record) = self.urls.find_by_code(code).await? else {
            if !self.negative_cache_ttl.is_zero()
                && let Err(e) = self
                    .cache
                    .set_not_found(code, self.negative_cache_ttl)
                    .await
            {
                warn!(code = %code, "Failed to cache negative entry: {}", e);
            }
            return Ok(Resolution::NotFound);
        };

        let now = Utc::now();
        if record.is_expired_at(now) {
            debug!(code = %code, "Short link expired");
            return Ok(Resolution::Expired);
        }

        if let Some(ttl) = record.cache_ttl(self.cache_ttl, now)
            && let Err(e) = self
                .cache
                .set_url(code, &record.target_url, Some(ttl))
                .await
        {
            warn!(code = %code, "Failed to populate cache: {}", e);
        }

        Ok(Resolution::Found(record.target_url))
    }
}
