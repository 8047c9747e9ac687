//! Repository trait for visit analytics.

use crate::domain::entities::{DailyVisits, VisitEvent};
use crate::error::AppError;
use async_trait::async_trait;

/// Repository interface for persisting and querying visits.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgVisitRepository`] - PostgreSQL implementation
/// - [`crate::infrastructure::persistence::MemoryRepository`] - In-process implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VisitRepository: Send + Sync {
    /// Durably records a batch of visits in a single write.
    ///
    /// Appends the raw visits, bumps the per-code/per-day counters and the
    /// per-link totals. Either everything in the batch is applied or nothing is.
    /// Visits for codes with no stored link are still logged.
    ///
    /// Returns the number of visits written.
    async fn record_batch(&self, visits: &[VisitEvent]) -> Result<u64, AppError>;

    /// Daily counts for `code` over the last `days` days (today included),
    /// ascending by day. Days without visits are omitted.
    async fn daily_visits(&self, code: &str, days: u32) -> Result<Vec<DailyVisits>, AppError>;

    /// Total number of logged visits across all codes.
    async fn count_visits(&self) -> Result<i64, AppError>;
}
