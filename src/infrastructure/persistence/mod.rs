//! Storage backends.
//!
//! Concrete implementations of the domain repository traits.
//!
//! # Repositories
//!
//! - [`PgUrlRepository`] - Short link storage in PostgreSQL
//! - [`PgVisitRepository`] - Visit log and counters in PostgreSQL
//! - [`MemoryRepository`] - Both traits in process memory

pub mod memory;
pub mod pg_url_repository;
pub mod pg_visit_repository;

pub use memory::MemoryRepository;
pub use pg_url_repository::PgUrlRepository;
pub use pg_visit_repository::PgVisitRepository;
