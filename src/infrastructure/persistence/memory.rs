//! In-process storage backend.
//!
//! Implements both repository traits over `DashMap`s with the same semantics
//! as the PostgreSQL backend: code uniqueness is decided atomically by the map
//! entry API, and a visit batch is applied as a whole. Selected with
//! `STORAGE_BACKEND=memory`; data does not survive a restart.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::json;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};

use crate::domain::entities::{DailyVisits, NewUrlRecord, UrlRecord, VisitEvent};
use crate::domain::repositories::{InsertOutcome, UrlRepository, VisitRepository};
use crate::error::AppError;

#[derive(Debug, Default)]
pub struct MemoryRepository {
    urls: DashMap<String, UrlRecord>,
    daily: DashMap<(String, NaiveDate), i64>,
    visit_log: Mutex<Vec<VisitEvent>>,
    batch_sizes: Mutex<Vec<usize>>,
    next_id: AtomicI64,
    reads: AtomicU64,
    insert_attempts: AtomicU64,
    unavailable: AtomicBool,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `find_by_code` calls served so far.
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Number of `insert_if_absent` calls, conflicting ones included.
    pub fn insert_attempts(&self) -> u64 {
        self.insert_attempts.load(Ordering::Relaxed)
    }

    /// Sizes of every batch written through `record_batch`, in order.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes
            .lock()
            .map(|sizes| sizes.clone())
            .unwrap_or_default()
    }

    /// Raw visits logged so far.
    pub fn visits(&self) -> Vec<VisitEvent> {
        self.visit_log
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    /// Simulates an outage: while unavailable every call fails with
    /// [`AppError::StorageUnavailable`].
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::Relaxed);
    }

    fn check_available(&self) -> Result<(), AppError> {
        if self.unavailable.load(Ordering::Relaxed) {
            return Err(AppError::storage_unavailable(
                "Storage unavailable",
                json!({ "backend": "memory" }),
            ));
        }
        Ok(())
    }

    fn poisoned() -> AppError {
        AppError::internal("Memory storage lock poisoned", json!({}))
    }
}

#[async_trait]
impl UrlRepository for MemoryRepository {
    async fn insert_if_absent(&self, new_record: NewUrlRecord) -> Result<InsertOutcome, AppError> {
        self.insert_attempts.fetch_add(1, Ordering::Relaxed);
        self.check_available()?;

        match self.urls.entry(new_record.code) {
            Entry::Occupied(_) => Ok(InsertOutcome::Conflict),
            Entry::Vacant(slot) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
                let record = UrlRecord::new(
                    id,
                    slot.key().clone(),
                    new_record.target_url,
                    Utc::now(),
                    new_record.expires_at,
                );
                slot.insert(record.clone());
                Ok(InsertOutcome::Inserted(record))
            }
        }
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<UrlRecord>, AppError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.check_available()?;

        Ok(self.urls.get(code).map(|r| r.value().clone()))
    }

    async fn count(&self) -> Result<i64, AppError> {
        self.check_available()?;
        Ok(self.urls.len() as i64)
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.check_available()
    }
}

#[async_trait]
impl VisitRepository for MemoryRepository {
    async fn record_batch(&self, visits: &[VisitEvent]) -> Result<u64, AppError> {
        self.check_available()?;
        if visits.is_empty() {
            return Ok(0);
        }

        // Held for the whole batch so readers never observe half of it.
        let mut log = self.visit_log.lock().map_err(|_| Self::poisoned())?;

        for visit in visits {
            *self
                .daily
                .entry((visit.code.clone(), visit.day()))
                .or_default() += 1;

            if let Some(mut record) = self.urls.get_mut(&visit.code) {
                record.visit_count += 1;
                record.last_visited_at = record.last_visited_at.max(Some(visit.visited_at));
            }
        }
        log.extend_from_slice(visits);

        self.batch_sizes
            .lock()
            .map_err(|_| Self::poisoned())?
            .push(visits.len());

        Ok(visits.len() as u64)
    }

    async fn daily_visits(&self, code: &str, days: u32) -> Result<Vec<DailyVisits>, AppError> {
        self.check_available()?;

        let today = Utc::now().date_naive();
        let since = today - Duration::days(i64::from(days.max(1)) - 1);

        let mut result: Vec<DailyVisits> = self
            .daily
            .iter()
            .filter(|e| e.key().0 == code && e.key().1 >= since && e.key().1 <= today)
            .map(|e| DailyVisits {
                day: e.key().1,
                count: *e.value(),
            })
            .collect();
        result.sort_by_key(|d| d.day);

        Ok(result)
    }

    async fn count_visits(&self) -> Result<i64, AppError> {
        self.check_available()?;
        let log = self.visit_log.lock().map_err(|_| Self::poisoned())?;
        Ok(log.len() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_record(code: &str) -> NewUrlRecord {
        NewUrlRecord {
            code: code.to_string(),
            target_url: "https://example.com/".to_string(),
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn test_insert_then_conflict() {
        let repo = MemoryRepository::new();

        let first = repo.insert_if_absent(new_record("abc")).await.unwrap();
        let second = repo.insert_if_absent(new_record("abc")).await.unwrap();

        assert!(matches!(first, InsertOutcome::Inserted(ref r) if r.id == 1));
        assert_eq!(second, InsertOutcome::Conflict);
        assert_eq!(repo.insert_attempts(), 2);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_find_counts_reads() {
        let repo = MemoryRepository::new();
        repo.insert_if_absent(new_record("abc")).await.unwrap();

        assert!(repo.find_by_code("abc").await.unwrap().is_some());
        assert!(repo.find_by_code("nope").await.unwrap().is_none());
        assert_eq!(repo.read_count(), 2);
    }

    #[tokio::test]
    async fn test_record_batch_updates_aggregates() {
        let repo = MemoryRepository::new();
        repo.insert_if_absent(new_record("abc")).await.unwrap();

        let visits = vec![
            VisitEvent::new("abc".into(), None, None),
            VisitEvent::new("abc".into(), None, None),
            VisitEvent::new("ghost".into(), None, None),
        ];
        assert_eq!(repo.record_batch(&visits).await.unwrap(), 3);

        let record = repo.find_by_code("abc").await.unwrap().unwrap();
        assert_eq!(record.visit_count, 2);
        assert!(record.last_visited_at.is_some());

        let daily = repo.daily_visits("abc", 7).await.unwrap();
        assert_eq!(daily.len(), 1);
        assert_eq!(daily[0].count, 2);

        assert_eq!(repo.count_visits().await.unwrap(), 3);
        assert_eq!(repo.batch_sizes(), vec![3]);
    }

    #[tokio::test]
    async fn test_unavailable_storage_fails() {
        let repo = MemoryRepository::new();
        repo.set_available(false);

        let err = repo.find_by_code("abc").await.unwrap_err();
        assert!(matches!(err, AppError::StorageUnavailable { .. }));
        assert!(repo.ping().await.is_err());

        repo.set_available(true);
        assert!(repo.ping().await.is_ok());
    }
}
