//! Business logic services for the application layer.

pub mod link_service;
pub mod redirect_service;
pub mod stats_service;

pub use link_service::{CreateLink, LinkService, MAX_ALLOCATION_RETRIES};
pub use redirect_service::{RedirectService, Resolution, Visitor};
pub use stats_service::{StatsService, UrlStats};
