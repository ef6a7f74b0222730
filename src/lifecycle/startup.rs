//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order:
//!   cache store → upstream client → resilience stack → service
//! - Bind the listener last, so traffic only arrives when ready
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - An unreachable Redis at boot is fatal; later outages degrade to misses

use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::cache::{KeyValueStore, MemoryStore, RateCache, StoreError};
use crate::config::{CacheBackend, CacheConfig, ConfigError, GatewayConfig};
use crate::http::{AppState, HttpServer};
use crate::lifecycle::Shutdown;
use crate::rates::RateService;
use crate::resilience::{protect, BreakerRegistry};
use crate::upstream::{ClientError, HttpRateClient};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("upstream client: {0}")]
    Client(#[from] ClientError),

    #[error("cache store: {0}")]
    Cache(#[from] StoreError),

    #[error("the redis cache backend requires building with the `redis` feature")]
    RedisDisabled,

    #[error("metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("invalid address '{0}'")]
    Address(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Wire every subsystem from a validated config.
pub async fn build_state(config: GatewayConfig) -> Result<AppState, StartupError> {
    let config = Arc::new(config);

    let store = build_store(&config.cache).await?;
    let cache = RateCache::new(store, config.cache.ttl());

    let client = HttpRateClient::new(&config.upstream)?;
    tracing::info!(
        base_url = %config.upstream.base_url,
        currencies = ?client.currencies(),
        "Upstream client ready"
    );

    let breakers = Arc::new(BreakerRegistry::from_settings(
        &config.resilience.circuit_breaker,
    ));
    let fetcher = protect(client, &config.resilience, Arc::clone(&breakers));
    let rates = RateService::new(cache, Arc::new(fetcher));

    Ok(AppState {
        rates,
        breakers,
        config,
    })
}

async fn build_store(config: &CacheConfig) -> Result<Arc<dyn KeyValueStore>, StartupError> {
    match config.backend {
        CacheBackend::Memory => {
            tracing::info!(ttl_secs = config.ttl_secs, "Using in-memory rate cache");
            Ok(Arc::new(MemoryStore::new()))
        }
        #[cfg(feature = "redis")]
        CacheBackend::Redis => {
            let store = crate::cache::RedisStore::connect(&config.redis_url).await?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "redis"))]
        CacheBackend::Redis => Err(StartupError::RedisDisabled),
    }
}

/// Bind the configured address and serve until `shutdown` fires.
pub async fn serve(state: AppState, shutdown: &Shutdown) -> Result<(), StartupError> {
    let bind_address = state.config.listener.bind_address.clone();
    let listener = TcpListener::bind(&bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    HttpServer::new(state)
        .run(listener, shutdown.subscribe())
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_build_state_from_defaults() {
        let state = build_state(GatewayConfig::default()).await.unwrap();

        assert!(state.rates.resolve("usd").is_ok());
        assert!(state.rates.resolve("GBP").is_err());
        assert!(state.breakers.snapshots().is_empty());
    }

    #[cfg(not(feature = "redis"))]
    #[tokio::test]
    async fn test_redis_backend_needs_feature() {
        let mut config = GatewayConfig::default();
        config.cache.backend = CacheBackend::Redis;

        assert!(matches!(
            build_state(config).await,
            Err(StartupError::RedisDisabled)
        ));
    }
}
