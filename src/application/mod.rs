//! Application layer services implementing business logic.
//!
//! Services orchestrate the domain: they coordinate repository and cache calls,
//! apply validation and business rules, and give HTTP handlers a small API.
//!
//! # Available Services
//!
//! - [`services::link_service::LinkService`] - Short link creation (code allocation)
//! - [`services::redirect_service::RedirectService`] - Code resolution and visit hand-off
//! - [`services::stats_service::StatsService`] - Visit statistics

pub mod services;
