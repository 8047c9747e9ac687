//! Shared application state injected into every handler.

use std::sync::Arc;
use std::time::Duration;

use crate::application::services::{LinkService, RedirectService, StatsService};
use crate::domain::repositories::{UrlRepository, VisitRepository};
use crate::domain::visit_pipeline::VisitRecorder;
use crate::infrastructure::cache::CacheService;
use crate::utils::code_generator::CodeGenerator;

/// Service-level settings taken from [`crate::config::Config`].
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub base_url: String,
    pub cache_ttl: Duration,
    /// Zero disables negative caching.
    pub negative_cache_ttl: Duration,
    pub max_allocation_retries: u32,
    /// Trust `X-Forwarded-For` / `X-Real-IP` for the client address.
    pub behind_proxy: bool,
}

/// Everything handlers need, built once at startup. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub link_service: Arc<LinkService>,
    pub redirect_service: Arc<RedirectService>,
    pub stats_service: Arc<StatsService>,
    pub urls: Arc<dyn UrlRepository>,
    pub cache: Arc<dyn CacheService>,
    pub visit_recorder: VisitRecorder,
    pub behind_proxy: bool,
}

impl AppState {
    /// Wires the services over the given backends.
    pub fn new(
        urls: Arc<dyn UrlRepository>,
        visits: Arc<dyn VisitRepository>,
        cache: Arc<dyn CacheService>,
        visit_recorder: VisitRecorder,
        generator: Arc<dyn CodeGenerator>,
        settings: ServiceSettings,
    ) -> Self {
        let link_service = LinkService::new(
            urls.clone(),
            cache.clone(),
            generator,
            settings.base_url,
            settings.cache_ttl,
            settings.max_allocation_retries,
        );

        let redirect_service = RedirectService::new(
            urls.clone(),
            cache.clone(),
            visit_recorder.clone(),
            settings.cache_ttl,
            settings.negative_cache_ttl,
        );

        let stats_service = StatsService::new(urls.clone(), visits);

        Self {
            link_service: Arc::new(link_service),
            redirect_service: Arc::new(redirect_service),
            stats_service: Arc::new(stats_service),
            urls,
            cache,
            visit_recorder,
            behind_proxy: settings.behind_proxy,
        }
    }
}
