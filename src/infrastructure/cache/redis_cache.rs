//! Redis-backed cache implementation.

use super::service::{CacheError, CacheLookup, CacheResult, CacheService};
use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Stored in place of a URL for negative entries. Cannot be a valid target
/// since every stored URL carries a scheme.
const NOT_FOUND_MARKER: &str = "\u{0}not-found";

/// Redis cache shared by every service instance.
///
/// Uses `ConnectionManager` for automatic reconnection. All operations are
/// fail-open: errors are logged and reported as a miss or ignored.
pub struct RedisCache {
    client: ConnectionManager,
    default_ttl: Duration,
    key_prefix: String,
}

impl RedisCache {
    /// Connects to Redis and validates the connection with a PING.
    ///
    /// # Arguments
    ///
    /// - `redis_url` - Redis connection string (e.g., `"redis://localhost:6379"`)
    /// - `default_ttl` - TTL applied when [`CacheService::set_url`] is called
    ///   with `ttl = None`; controlled via `CACHE_TTL_SECONDS`
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::ConnectionError`] if the URL is invalid, the connection cannot
    /// be established, or the PING health check fails.
    pub async fn connect(redis_url: &str, default_ttl: Duration) -> CacheResult<Self> {
        info!("Connecting to Redis");

        let client = Client::open(redis_url).map_err(|e| {
            CacheError::ConnectionError(format!("Failed to create Redis client: {}", e))
        })?;

        let manager = ConnectionManager::new(client).await.map_err(|e| {
            CacheError::ConnectionError(format!("Failed to connect to Redis: {}", e))
        })?;

        let mut test_conn = manager.clone();
        test_conn
            .ping::<()>()
            .await
            .map_err(|e| CacheError::ConnectionError(format!("Redis PING failed: {}", e)))?;

        info!("✓ Connected to Redis");

        Ok(Self {
            client: manager,
            default_ttl,
            key_prefix: "url:".to_string(),
        })
    }

    fn build_key(&self, short_code: &str) -> String {
        format!("{}{}", self.key_prefix, short_code)
    }

    /// Millisecond expiry, truncated so an entry never outlives the link's
    /// `expires_at`. Sub-millisecond TTLs are not stored.
    fn ttl_millis(ttl: Duration) -> Option<u64> {
        u64::try_from(ttl.as_millis())
            .ok()
            .filter(|millis| *millis > 0)
    }

    async fn put(&self, short_code: &str, value: &str, ttl: Duration) {
        let Some(ttl_ms) = Self::ttl_millis(ttl) else {
            return;
        };
        let key = self.build_key(short_code);
        let mut conn = self.client.clone();

        match conn.pset_ex::<_, _, ()>(&key, value, ttl_ms).await {
            Ok(_) => debug!(code = %short_code, ttl_ms, "Cache SET"),
            Err(e) => warn!(code = %short_code, "Redis SET error: {}", e),
        }
    }
}

#[async_trait]
impl CacheService for RedisCache {
    async fn get_url(&self, short_code: &str) -> CacheResult<CacheLookup> {
        let key = self.build_key(short_code);
        let mut conn = self.client.clone();

        match conn.get::<_, Option<String>>(&key).await {
            Ok(Some(value)) if value == NOT_FOUND_MARKER => Ok(CacheLookup::NotFound),
            Ok(Some(url)) => {
                debug!(code = %short_code, "Cache HIT");
                Ok(CacheLookup::Hit(url))
            }
            Ok(None) => {
                debug!(code = %short_code, "Cache MISS");
                Ok(CacheLookup::Miss)
            }
            Err(e) => {
                error!(code = %short_code, "Redis GET error: {}", e);
                Ok(CacheLookup::Miss)
            }
        }
    }

    async fn set_url(
        &self,
        short_code: &str,
        target_url: &str,
        ttl: Option<Duration>,
    ) -> CacheResult<()> {
        let ttl = ttl.unwrap_or(self.default_ttl);
        if !ttl.is_zero() {
            self.put(short_code, target_url, ttl).await;
        }
        Ok(())
    }

    async fn set_not_found(&self, short_code: &str, ttl: Duration) -> CacheResult<()> {
        if !ttl.is_zero() {
            self.put(short_code, NOT_FOUND_MARKER, ttl).await;
        }
        Ok(())
    }

    async fn invalidate(&self, short_code: &str) -> CacheResult<()> {
        let key = self.build_key(short_code);
        let mut conn = self.client.clone();

        match conn.del::<_, i32>(&key).await {
            Ok(deleted) => {
                if deleted > 0 {
                    debug!(code = %short_code, "Cache INVALIDATE");
                }
                Ok(())
            }
            Err(e) => {
                warn!(code = %short_code, "Redis DEL error: {}", e);
                Ok(())
            }
        }
    }

    async fn health_check(&self) -> bool {
        let mut conn = self.client.clone();
        conn.ping::<()>().await.is_ok()
    }
}
