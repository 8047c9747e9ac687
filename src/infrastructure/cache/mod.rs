//! Caching layer for fast redirect lookups.
//!
//! Provides a [`CacheService`] trait with three implementations:
//! - [`MemoryCache`] - In-process moka cache (TTL, optional LRU bound)
//! - [`RedisCache`] - Redis-backed cache shared between instances
//! - [`NullCache`] - No-op implementation for disabled caching

mod memory_cache;
mod null_cache;
mod redis_cache;
mod service;

pub use memory_cache::{CacheEntry, MemoryCache};
pub use null_cache::NullCache;
pub use redis_cache::RedisCache;
pub use service::{CacheError, CacheLookup, CacheResult, CacheService};
