//! Cache service trait and error types.

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

/// Errors that can occur during cache operations.
#[derive(Debug)]
pub enum CacheError {
    ConnectionError(String),
    OperationError(String),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::ConnectionError(e) => write!(f, "Cache connection error: {}", e),
            Self::OperationError(e) => write!(f, "Cache operation error: {}", e),
        }
    }
}

impl std::error::Error for CacheError {}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Outcome of a cache lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    /// The code maps to this target URL.
    Hit(String),
    /// A negative entry: the code is known not to exist.
    NotFound,
    /// Nothing cached for the code.
    Miss,
}

/// Trait for caching short code → URL mappings.
///
/// The cache is a disposable projection of storage. Implementations must be
/// thread-safe and handle errors gracefully without disrupting the request
/// path: callers treat any error as a miss.
///
/// # Implementations
///
/// - [`crate::infrastructure::cache::MemoryCache`] - In-process TTL cache (optionally LRU-bounded)
/// - [`crate::infrastructure::cache::RedisCache`] - Redis-backed cache shared between instances
/// - [`crate::infrastructure::cache::NullCache`] - No-op implementation for disabled caching
#[async_trait]
pub trait CacheService: Send + Sync {
    /// Looks up the target URL for a short code.
    async fn get_url(&self, short_code: &str) -> CacheResult<CacheLookup>;

    /// Stores a URL mapping.
    ///
    /// `ttl = None` applies the implementation's configured default TTL.
    async fn set_url(
        &self,
        short_code: &str,
        target_url: &str,
        ttl: Option<Duration>,
    ) -> CacheResult<()>;

    /// Stores a negative entry so repeated lookups for an unknown code skip
    /// storage until `ttl` elapses.
    async fn set_not_found(&self, short_code: &str, ttl: Duration) -> CacheResult<()>;

    /// Removes any entry (positive or negative) for the code.
    async fn invalidate(&self, short_code: &str) -> CacheResult<()>;

    /// Checks if the cache backend is healthy.
    ///
    /// Used by the health endpoint to report cache status.
    async fn health_check(&self) -> bool;
}
