//! HTTP server initialization and runtime setup.
//!
//! Builds the storage and cache backends, spawns the visit pipeline and runs
//! the Axum server until a shutdown signal arrives.

use crate::config::{CacheBackend, Config, StorageBackend};
use crate::domain::repositories::{UrlRepository, VisitRepository};
use crate::domain::visit_pipeline::{PipelineConfig, VisitPipeline};
use crate::infrastructure::cache::{CacheService, MemoryCache, NullCache, RedisCache};
use crate::infrastructure::persistence::{MemoryRepository, PgUrlRepository, PgVisitRepository};
use crate::routes::app_router;
use crate::state::{AppState, ServiceSettings};
use crate::utils::code_generator::RandomCodeGenerator;

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - Storage (PostgreSQL pool + migrations, or in-memory)
/// - Cache (moka, Redis, or disabled)
/// - Background visit pipeline
/// - Axum HTTP server
///
/// On SIGINT/SIGTERM the server stops accepting connections, finishes in-flight
/// requests, then the pipeline flushes every queued visit before returning.
///
/// # Errors
///
/// Returns an error if:
/// - Database connection or migration fails
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let (urls, visits) = build_storage(&config).await?;
    let cache = build_cache(&config).await;

    let (visit_recorder, pipeline) = VisitPipeline::spawn(
        visits.clone(),
        PipelineConfig {
            queue_capacity: config.visit_queue_capacity,
            batch_size: config.batch_size,
            flush_interval: config.flush_interval(),
            flush_retries: config.flush_retries,
        },
    );

    let state = AppState::new(
        urls,
        visits,
        cache,
        visit_recorder,
        Arc::new(RandomCodeGenerator::default()),
        ServiceSettings {
            base_url: config.base_url.clone(),
            cache_ttl: config.cache_ttl(),
            negative_cache_ttl: config.negative_cache_ttl(),
            max_allocation_retries: config.max_allocation_retries,
            behind_proxy: config.behind_proxy,
        },
    );

    let app = app_router(state);

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("HTTP server stopped, flushing visits");
    pipeline.shutdown().await;

    Ok(())
}

/// Connects a PostgreSQL pool sized from the config.
///
/// `pool_size` connections are kept open; bursts may open up to
/// `max_overflow` more.
pub async fn connect_pool(config: &Config) -> Result<PgPool> {
    let database_url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL is not configured")?;

    let pool = PgPoolOptions::new()
        .max_connections(config.pool_size + config.max_overflow)
        .min_connections(config.pool_size)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .connect(database_url)
        .await
        .context("Failed to connect to database")?;

    Ok(pool)
}

async fn build_storage(
    config: &Config,
) -> Result<(Arc<dyn UrlRepository>, Arc<dyn VisitRepository>)> {
    match config.storage_backend {
        StorageBackend::Postgres => {
            let pool = connect_pool(config).await?;
            tracing::info!("Connected to database");

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to run migrations")?;

            let pool = Arc::new(pool);
            Ok((
                Arc::new(PgUrlRepository::new(pool.clone())),
                Arc::new(PgVisitRepository::new(pool)),
            ))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            let repo = Arc::new(MemoryRepository::new());
            Ok((repo.clone(), repo))
        }
    }
}

async fn build_cache(config: &Config) -> Arc<dyn CacheService> {
    let ttl = config.cache_ttl();

    match (config.cache_backend, &config.redis_url) {
        (CacheBackend::Memory, _) => {
            tracing::info!("Cache enabled (in-memory)");
            Arc::new(MemoryCache::new(ttl))
        }
        (CacheBackend::Lru, _) => {
            tracing::info!("Cache enabled (in-memory LRU, capacity {})", config.cache_capacity);
            Arc::new(MemoryCache::bounded(config.cache_capacity, ttl))
        }
        (CacheBackend::Redis, Some(redis_url)) => match RedisCache::connect(redis_url, ttl).await {
            Ok(redis) => {
                tracing::info!("Cache enabled (Redis)");
                Arc::new(redis)
            }
            Err(e) => {
                tracing::warn!("Failed to connect to Redis: {}. Using NullCache.", e);
                Arc::new(NullCache::new())
            }
        },
        (CacheBackend::Redis, None) | (CacheBackend::None, _) => {
            tracing::info!("Cache disabled (NullCache)");
            Arc::new(NullCache::new())
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
