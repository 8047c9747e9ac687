#![allow(dead_code)]

use axum::{Router, extract::ConnectInfo};
use axum_test::TestServer;
use chrono::{DateTime, Utc};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tower::Layer;

use shortlink::domain::entities::{NewUrlRecord, UrlRecord};
use shortlink::domain::repositories::{InsertOutcome, UrlRepository};
use shortlink::domain::visit_pipeline::{PipelineConfig, VisitPipeline, VisitPipelineHandle};
use shortlink::infrastructure::cache::{CacheService, MemoryCache};
use shortlink::infrastructure::persistence::MemoryRepository;
use shortlink::state::{AppState, ServiceSettings};
use shortlink::utils::code_generator::{CodeGenerator, RandomCodeGenerator, ShortCode};

pub const BASE_URL: &str = "http://sho.rt";

/// Inserts `ConnectInfo` the way `into_make_service_with_connect_info` would.
#[derive(Clone)]
pub struct MockConnectInfoLayer;

impl<S> Layer<S> for MockConnectInfoLayer {
    type Service = MockConnectInfoService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MockConnectInfoService { inner }
    }
}

#[derive(Clone)]
pub struct MockConnectInfoService<S> {
    inner: S,
}

impl<S, B> tower::Service<axum::http::Request<B>> for MockConnectInfoService<S>
where
    S: tower::Service<axum::http::Request<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: axum::http::Request<B>) -> Self::Future {
        let addr: SocketAddr = "127.0.0.1:12345".parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        self.inner.call(req)
    }
}

/// Returns codes from a fixed list, round-robin.
pub struct CyclingGenerator {
    codes: Vec<String>,
    next: AtomicUsize,
}

impl CyclingGenerator {
    pub fn new(codes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            codes: codes.into_iter().map(Into::into).collect(),
            next: AtomicUsize::new(0),
        }
    }
}

impl CodeGenerator for CyclingGenerator {
    fn generate(&self) -> ShortCode {
        let i = self.next.fetch_add(1, Ordering::Relaxed) % self.codes.len();
        ShortCode::parse(&self.codes[i]).unwrap()
    }
}

pub struct TestAppBuilder {
    generator: Arc<dyn CodeGenerator>,
    cache_ttl: Duration,
    negative_cache_ttl: Duration,
    max_allocation_retries: u32,
    pipeline: PipelineConfig,
}

impl Default for TestAppBuilder {
    fn default() -> Self {
        Self {
            generator: Arc::new(RandomCodeGenerator::default()),
            cache_ttl: Duration::from_secs(3600),
            negative_cache_ttl: Duration::ZERO,
            max_allocation_retries: 5,
            pipeline: PipelineConfig {
                flush_interval: Duration::from_secs(60),
                ..PipelineConfig::default()
            },
        }
    }
}

impl TestAppBuilder {
    pub fn generator(mut self, generator: impl CodeGenerator + 'static) -> Self {
        self.generator = Arc::new(generator);
        self
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn negative_cache_ttl(mut self, ttl: Duration) -> Self {
        self.negative_cache_ttl = ttl;
        self
    }

    pub fn max_allocation_retries(mut self, attempts: u32) -> Self {
        self.max_allocation_retries = attempts;
        self
    }

    pub fn build(self) -> TestApp {
        let repo = Arc::new(MemoryRepository::new());
        let cache = Arc::new(MemoryCache::new(self.cache_ttl));
        let (recorder, pipeline) = VisitPipeline::spawn(repo.clone(), self.pipeline);

        let state = AppState::new(
            repo.clone(),
            repo.clone(),
            cache.clone() as Arc<dyn CacheService>,
            recorder,
            self.generator,
            ServiceSettings {
                base_url: BASE_URL.to_string(),
                cache_ttl: self.cache_ttl,
                negative_cache_ttl: self.negative_cache_ttl,
                max_allocation_retries: self.max_allocation_retries,
                behind_proxy: false,
            },
        );

        let app: Router = shortlink::api::routes::routes()
            .layer(MockConnectInfoLayer)
            .with_state(state.clone());

        TestApp {
            server: TestServer::new(app).unwrap(),
            state,
            repo,
            cache,
            pipeline: Some(pipeline),
        }
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub repo: Arc<MemoryRepository>,
    pub cache: Arc<MemoryCache>,
    pipeline: Option<VisitPipelineHandle>,
}

impl TestApp {
    pub fn new() -> Self {
        TestAppBuilder::default().build()
    }

    pub fn builder() -> TestAppBuilder {
        TestAppBuilder::default()
    }

    /// Stores a link directly, bypassing validation and the cache.
    pub async fn seed(
        &self,
        code: &str,
        target_url: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> UrlRecord {
        let outcome = self
            .repo
            .insert_if_absent(NewUrlRecord {
                code: code.to_string(),
                target_url: target_url.to_string(),
                expires_at,
            })
            .await
            .unwrap();

        match outcome {
            InsertOutcome::Inserted(record) => record,
            InsertOutcome::Conflict => panic!("code {code} already seeded"),
        }
    }

    /// Stops the visit pipeline, waiting for every queued visit to be written.
    pub async fn flush_visits(&mut self) {
        if let Some(pipeline) = self.pipeline.take() {
            pipeline.shutdown().await;
        }
    }
}
