//! Repository trait for short link storage.

use crate::domain::entities::{NewUrlRecord, UrlRecord};
use crate::error::AppError;
use async_trait::async_trait;

/// Result of a conditional insert.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    Inserted(UrlRecord),
    /// A record with the same code already exists; nothing was written.
    Conflict,
}

/// Repository interface for the durable code → URL mapping.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgUrlRepository`] - PostgreSQL implementation
/// - [`crate::infrastructure::persistence::MemoryRepository`] - In-process implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UrlRepository: Send + Sync {
    /// Inserts the record only if no record with the same code exists.
    ///
    /// Must be atomic with respect to concurrent callers on any instance: the
    /// uniqueness decision is made by the store, never by a prior read.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::StorageUnavailable`] if the store cannot be reached,
    /// [`AppError::Internal`] on other database errors. A taken code is *not*
    /// an error; it is reported as [`InsertOutcome::Conflict`].
    async fn insert_if_absent(&self, new_record: NewUrlRecord) -> Result<InsertOutcome, AppError>;

    /// Finds a record by code, expired or not.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::StorageUnavailable`] / [`AppError::Internal`] on
    /// storage failures.
    async fn find_by_code(&self, code: &str) -> Result<Option<UrlRecord>, AppError>;

    /// Counts all stored records.
    async fn count(&self) -> Result<i64, AppError>;

    /// Verifies the store is reachable.
    async fn ping(&self) -> Result<(), AppError>;
}
