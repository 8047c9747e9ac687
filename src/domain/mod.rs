//! Domain layer containing business entities and logic.
//!
//! Defines entities, repository interfaces and the visit ingestion pipeline,
//! independent of infrastructure concerns.
//!
//! # Architecture
//!
//! - [`entities`] - Core business data structures
//! - [`repositories`] - Data access trait definitions
//! - [`visit_pipeline`] - Asynchronous, batched visit recording
//!
//! # Visit Processing Flow
//!
//! 1. The redirect resolver builds a [`entities::VisitEvent`]
//! 2. [`visit_pipeline::VisitRecorder::record`] enqueues it without waiting
//! 3. The pipeline consumer batches events by size or time
//! 4. Each batch is persisted via [`repositories::VisitRepository::record_batch`]

pub mod entities;
pub mod repositories;
pub mod visit_pipeline;
