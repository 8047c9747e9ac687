//! No-op cache implementation for disabled caching.

use super::service::{CacheLookup, CacheResult, CacheService};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// A cache implementation that does nothing.
///
/// Every lookup is a miss, so each redirect goes to storage. Selected with
/// `CACHE_BACKEND=none`, and used as the fallback when Redis is unreachable at
/// startup.
pub struct NullCache;

impl NullCache {
    pub fn new() -> Self {
        debug!("Using NullCache (caching disabled)");
        Self
    }
}

impl Default for NullCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheService for NullCache {
    async fn get_url(&self, _short_code: &str) -> CacheResult<CacheLookup> {
        Ok(CacheLookup::Miss)
    }

    async fn set_url(
        &self,
        _short_code: &str,
        _target_url: &str,
        _ttl: Option<Duration>,
    ) -> CacheResult<()> {
        Ok(())
    }

    async fn set_not_found(&self, _short_code: &str, _ttl: Duration) -> CacheResult<()> {
        Ok(())
    }

    async fn invalidate(&self, _short_code: &str) -> CacheResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}
