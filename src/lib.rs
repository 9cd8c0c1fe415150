pub mod config;
pub mod error;
pub mod metrics;
pub mod rate_limit;

use crate::config::{LimiterConfig, StoreBackend};
use crate::error::{LimiterError, Result};
use crate::metrics::{metrics_handler, MetricsService};
use crate::rate_limit::{
    check_handler, MemoryCounterStore, RateLimitState, RateLimiter, RedisCounterStore,
};
use axum::{routing::get, Router as AxumRouter};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Build a rate limiter over the configured counter store
///
/// The memory backend also gets its background cleanup task.
pub async fn build_limiter(config: &LimiterConfig) -> Result<RateLimiter> {
    let rate_limit = config.rate_limit.clone();

    match config.store.backend {
        StoreBackend::Redis => {
            let store = Arc::new(RedisCounterStore::connect(&config.store.url).await?);
            RateLimiter::with_store(rate_limit, store)
        }
        StoreBackend::Memory => {
            info!("Using in-memory counter store; counts are not shared between instances");
            let store = Arc::new(MemoryCounterStore::new());
            store.spawn_cleanup_task(Duration::from_secs(config.store.cleanup_interval_secs));
            RateLimiter::with_store(rate_limit, store)
        }
    }
}

/// Build the HTTP app: every path is an admission check, except `/metrics`
pub fn build_app(state: RateLimitState, metrics: Option<MetricsService>) -> AxumRouter {
    let mut app = AxumRouter::new().fallback(check_handler).with_state(state);

    if let Some(metrics) = metrics {
        app = app.merge(
            AxumRouter::new()
                .route("/metrics", get(metrics_handler))
                .with_state(metrics),
        );
    }

    app.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

/// Initialize the limiter server
pub async fn init_limiter_server(config: LimiterConfig) -> Result<()> {
    config.validate()?;

    info!("Starting rate limiter");
    info!(
        "Server listening on {}:{}",
        config.server.host, config.server.port
    );

    let limiter = build_limiter(&config).await?;

    // Fail quickly if the store is unreachable
    if let Err(e) = limiter.ping().await {
        error!("Counter store ping failed: {}", e);
        return Err(e);
    }

    let metrics = if config.server.metrics_enabled {
        Some(MetricsService::new()?)
    } else {
        None
    };

    let app = build_app(RateLimitState::new(Arc::new(limiter)), metrics);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(LimiterError::Io)?;

    info!("Rate limiter ready to accept connections");

    axum::serve(listener, app)
        .await
        .map_err(|e| LimiterError::Internal(format!("Server error: {}", e)))?;

    Ok(())
}

/// Initialize tracing/logging
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "window_limiter=debug,tower_http=debug".into()),
        )
        .with_target(false)
        .compact()
        .init();
}
