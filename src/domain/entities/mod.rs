//! Core domain entities.
//!
//! - [`UrlRecord`] - Durable short code → target URL mapping (source of truth)
//! - [`VisitEvent`] - A single redirect, queued for batched persistence
//! - [`DailyVisits`] - Per-day visit aggregate
//!
//! Creation inputs live in separate structs (`NewUrlRecord`), following the
//! "New Type" pattern used across the crate.

pub mod url_record;
pub mod visit;

pub use url_record::{NewUrlRecord, UrlRecord};
pub use visit::{DailyVisits, VisitEvent};
