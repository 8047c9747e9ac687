//! Durable short code → target URL mapping.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// A stored short link.
///
/// `code` and `target_url` never change once the record is created. The visit
/// aggregates are maintained by the visit pipeline's bulk writes.
#[derive(Debug, Clone, PartialEq)]
pub struct UrlRecord {
    pub id: i64,
    pub code: String,
    pub target_url: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub visit_count: i64,
    pub last_visited_at: Option<DateTime<Utc>>,
}

impl UrlRecord {
    /// Creates a freshly inserted record with zeroed visit aggregates.
    pub fn new(
        id: i64,
        code: String,
        target_url: String,
        created_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            code,
            target_url,
            created_at,
            expires_at,
            visit_count: 0,
            last_visited_at: None,
        }
    }

    /// Returns true if the link has passed its expiry time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|e| now >= e)
    }

    /// TTL to use when caching this record.
    ///
    /// The default TTL, capped by the record's remaining lifetime so a cache
    /// entry never outlives its link. `None` means the record must not be
    /// cached (already expired).
    pub fn cache_ttl(&self, default_ttl: Duration, now: DateTime<Utc>) -> Option<Duration> {
        match self.expires_at {
            None => Some(default_ttl),
            Some(expires_at) => (expires_at - now)
                .to_std()
                .ok()
                .filter(|remaining| !remaining.is_zero())
                .map(|remaining| remaining.min(default_ttl)),
        }
    }
}

/// Input for the storage layer's conditional insert.
#[derive(Debug, Clone)]
pub struct NewUrlRecord {
    pub code: String,
    pub target_url: String,
    pub expires_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn record(expires_at: Option<DateTime<Utc>>) -> UrlRecord {
        UrlRecord::new(
            1,
            "abc1234".to_string(),
            "https://example.com/".to_string(),
            Utc::now(),
            expires_at,
        )
    }

    #[test]
    fn test_new_record_has_no_visits() {
        let r = record(None);
        assert_eq!(r.visit_count, 0);
        assert!(r.last_visited_at.is_none());
        assert!(!r.is_expired());
    }

    #[test]
    fn test_is_expired() {
        let r = record(Some(Utc::now() - ChronoDuration::seconds(1)));
        assert!(r.is_expired());
    }

    #[test]
    fn test_expiry_boundary_is_inclusive() {
        let now = Utc::now();
        let r = record(Some(now));
        assert!(r.is_expired_at(now));
        assert!(!r.is_expired_at(now - ChronoDuration::milliseconds(1)));
    }

    #[test]
    fn test_cache_ttl_without_expiry() {
        let ttl = Duration::from_secs(3600);
        assert_eq!(record(None).cache_ttl(ttl, Utc::now()), Some(ttl));
    }

    #[test]
    fn test_cache_ttl_capped_by_expiry() {
        let now = Utc::now();
        let r = record(Some(now + ChronoDuration::seconds(30)));
        assert_eq!(
            r.cache_ttl(Duration::from_secs(3600), now),
            Some(Duration::from_secs(30))
        );
    }

    #[test]
    fn test_cache_ttl_for_expired_record() {
        let now = Utc::now();
        let r = record(Some(now - ChronoDuration::seconds(5)));
        assert_eq!(r.cache_ttl(Duration::from_secs(3600), now), None);
    }
}
