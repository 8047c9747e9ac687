//! Repository trait definitions for the domain layer.
//!
//! These traits abstract data access following the Repository pattern.
//! Implementations live in `crate::infrastructure::persistence`; mocks are
//! generated via `mockall` for unit tests.
//!
//! - [`UrlRepository`] - Conditional insert and lookup of short links
//! - [`VisitRepository`] - Batched visit persistence and daily aggregates

pub mod url_repository;
pub mod visit_repository;

pub use url_repository::{InsertOutcome, UrlRepository};
pub use visit_repository::VisitRepository;

#[cfg(test)]
pub use url_repository::MockUrlRepository;
#[cfg(test)]
pub use visit_repository::MockVisitRepository;
