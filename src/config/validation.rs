//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (TTL > 0, ratios in (0, 1))
//! - Check the upstream URL and endpoint map are usable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::{CacheBackend, GatewayConfig};
use crate::rates::CurrencyCode;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a socket address")]
    BindAddress(String),

    #[error("upstream.base_url '{0}' must be an absolute http(s) URL")]
    BaseUrl(String),

    #[error("upstream.endpoints is empty")]
    NoEndpoints,

    #[error("upstream.endpoints key '{0}' is not a currency code")]
    EndpointCurrency(String),

    #[error("upstream.endpoints.{currency} path '{path}' must start with '/'")]
    EndpointPath { currency: String, path: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("resilience.circuit_breaker.failure_ratio {0} must be in (0, 1)")]
    FailureRatio(f64),

    #[error("cache.backend = \"redis\" requires the `redis` feature")]
    RedisUnavailable,

    #[error("admin.api_key must be set when admin is enabled")]
    AdminKey,
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    match Url::parse(&config.upstream.base_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
        _ => errors.push(ValidationError::BaseUrl(config.upstream.base_url.clone())),
    }

    if config.upstream.endpoints.is_empty() {
        errors.push(ValidationError::NoEndpoints);
    }
    for (currency, path) in &config.upstream.endpoints {
        if currency.parse::<CurrencyCode>().is_err() {
            errors.push(ValidationError::EndpointCurrency(currency.clone()));
        }
        if !path.starts_with('/') {
            errors.push(ValidationError::EndpointPath {
                currency: currency.clone(),
                path: path.clone(),
            });
        }
    }

    let positive = [
        (config.cache.ttl_secs, "cache.ttl_secs"),
        (config.resilience.timeout_ms, "resilience.timeout_ms"),
        (
            u64::from(config.resilience.retry.max_attempts),
            "resilience.retry.max_attempts",
        ),
        (
            config.resilience.circuit_breaker.request_volume_threshold as u64,
            "resilience.circuit_breaker.request_volume_threshold",
        ),
        (config.timeouts.request_secs, "timeouts.request_secs"),
    ];
    for (value, name) in positive {
        if value == 0 {
            errors.push(ValidationError::Zero(name));
        }
    }

    let ratio = config.resilience.circuit_breaker.failure_ratio;
    if !(ratio > 0.0 && ratio < 1.0) {
        errors.push(ValidationError::FailureRatio(ratio));
    }

    if config.cache.backend == CacheBackend::Redis && !cfg!(feature = "redis") {
        errors.push(ValidationError::RedisUnavailable);
    }

    if config.admin.enabled && config.admin.api_key.trim().is_empty() {
        errors.push(ValidationError::AdminKey);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
