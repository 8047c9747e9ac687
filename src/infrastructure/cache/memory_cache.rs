//! In-process cache backed by `moka`.

use super::service::{CacheLookup, CacheResult, CacheService};
use async_trait::async_trait;
use moka::future::Cache;
use moka::policy::{EvictionPolicy, Expiry};
use std::time::{Duration, Instant};
use tracing::debug;

/// A cached projection of a stored link. `target == None` is a negative entry.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub target: Option<String>,
    pub inserted_at: Instant,
    pub ttl: Duration,
}

/// Expires each entry after its own TTL.
struct EntryExpiry;

impl Expiry<String, CacheEntry> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CacheEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CacheEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Single-instance TTL cache.
///
/// Entries live in process memory, so each replica warms its own copy. Use
/// [`MemoryCache::bounded`] to cap memory with least-recently-used eviction.
pub struct MemoryCache {
    inner: Cache<String, CacheEntry>,
    default_ttl: Duration,
}

impl MemoryCache {
    /// Unbounded cache; entries leave only when their TTL elapses.
    pub fn new(default_ttl: Duration) -> Self {
        let inner = Cache::builder().expire_after(EntryExpiry).build();

        debug!(default_ttl_secs = default_ttl.as_secs(), "MemoryCache initialized");
        Self { inner, default_ttl }
    }

    /// Cache holding at most `capacity` entries, evicting the least recently
    /// used one when full.
    pub fn bounded(capacity: u64, default_ttl: Duration) -> Self {
        let inner = Cache::builder()
            .max_capacity(capacity)
            .eviction_policy(EvictionPolicy::lru())
            .expire_after(EntryExpiry)
            .build();

        debug!(
            capacity,
            default_ttl_secs = default_ttl.as_secs(),
            "MemoryCache (LRU) initialized"
        );
        Self { inner, default_ttl }
    }

    /// Applies pending evictions. Entry counts are eventually consistent
    /// otherwise.
    pub async fn sync(&self) {
        self.inner.run_pending_tasks().await;
    }

    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    async fn put(&self, short_code: &str, target: Option<String>, ttl: Duration) {
        let entry = CacheEntry {
            target,
            inserted_at: Instant::now(),
            ttl,
        };
        self.inner.insert(short_code.to_string(), entry).await;
    }
}

#[async_trait]
impl CacheService for MemoryCache {
    async fn get_url(&self, short_code: &str) -> CacheResult<CacheLookup> {
        Ok(match self.inner.get(short_code).await {
            Some(CacheEntry {
                target: Some(url), ..
            }) => CacheLookup::Hit(url),
            Some(CacheEntry { target: None, .. }) => CacheLookup::NotFound,
            None => CacheLookup::Miss,
        })
    }

    async fn set_url(
        &self,
        short_code: &str,
        target_url: &str,
        ttl: Option<Duration>,
    ) -> CacheResult<()> {
        let ttl = ttl.unwrap_or(self.default_ttl);
        if !ttl.is_zero() {
            self.put(short_code, Some(target_url.to_string()), ttl).await;
        }
        Ok(())
    }

    async fn set_not_found(&self, short_code: &str, ttl: Duration) -> CacheResult<()> {
        if !ttl.is_zero() {
            self.put(short_code, None, ttl).await;
        }
        Ok(())
    }

    async fn invalidate(&self, short_code: &str) -> CacheResult<()> {
        self.inner.invalidate(short_code).await;
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hit_after_set() {
        let cache = MemoryCache::new(Duration::from_secs(60));
        cache
            .set_url("abc1234", "https://example.com/", None)
            .await
            .unwrap();

        assert_eq!(
            cache.get_url("abc1234").await.unwrap(),
            CacheLookup::Hit("https://example.com/".to_string())
        );
        assert_eq!(cache.get_url("other").await.unwrap(), CacheLookup::Miss);
    }

    #[tokio::test]
    async fn test_negative_entry() {
        let cache = MemoryCache::new(Duration::from_secs(60));
        cache
            .set_not_found("missing", Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(
            cache.get_url("missing").await.unwrap(),
            CacheLookup::NotFound
        );
    }

    #[tokio::test]
    async fn test_entry_expires_after_its_ttl() {
        let cache = MemoryCache::new(Duration::from_secs(60));
        cache
            .set_url("short", "https://example.com/", Some(Duration::from_millis(50)))
            .await
            .unwrap();
        cache
            .set_url("long", "https://example.org/", None)
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(cache.get_url("short").await.unwrap(), CacheLookup::Miss);
        assert!(matches!(
            cache.get_url("long").await.unwrap(),
            CacheLookup::Hit(_)
        ));
    }

    #[tokio::test]
    async fn test_zero_ttl_is_not_stored() {
        let cache = MemoryCache::new(Duration::from_secs(60));
        cache
            .set_url("abc", "https://example.com/", Some(Duration::ZERO))
            .await
            .unwrap();
        cache.set_not_found("def", Duration::ZERO).await.unwrap();

        assert_eq!(cache.get_url("abc").await.unwrap(), CacheLookup::Miss);
        assert_eq!(cache.get_url("def").await.unwrap(), CacheLookup::Miss);
    }

    #[tokio::test]
    async fn test_invalidate_removes_entry() {
        let cache = MemoryCache::new(Duration::from_secs(60));
        cache
            .set_url("abc", "https://example.com/", None)
            .await
            .unwrap();
        cache.invalidate("abc").await.unwrap();

        assert_eq!(cache.get_url("abc").await.unwrap(), CacheLookup::Miss);
    }

    #[tokio::test]
    async fn test_bounded_cache_respects_capacity() {
        let cache = MemoryCache::bounded(10, Duration::from_secs(60));
        for i in 0..50 {
            cache
                .set_url(&format!("code{i}"), "https://example.com/", None)
                .await
                .unwrap();
        }
        cache.sync().await;

        assert!(cache.entry_count() <= 10);
    }
}
