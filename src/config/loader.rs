//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use crate::config::schema::{CacheBackend, GatewayConfig, LogFormat};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value '{value}' for {var}")]
    Env { var: &'static str, value: String },

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load, override from the environment and validate a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: GatewayConfig = toml::from_str(&content)?;

    apply_env_overrides(&mut config)?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Defaults plus environment overrides, for running without a file.
pub fn load_from_env() -> Result<GatewayConfig, ConfigError> {
    let mut config = GatewayConfig::default();

    apply_env_overrides(&mut config)?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply `RATES_*` variables from the process environment.
pub fn apply_env_overrides(config: &mut GatewayConfig) -> Result<(), ConfigError> {
    apply_overrides(config, |var| std::env::var(var).ok())
}

/// Apply overrides from an arbitrary lookup.
pub fn apply_overrides<F>(config: &mut GatewayConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("RATES_BIND_ADDRESS") {
        config.listener.bind_address = v;
    }
    if let Some(v) = lookup("RATES_UPSTREAM_BASE_URL") {
        config.upstream.base_url = v;
    }
    if let Some(v) = lookup("RATES_REDIS_URL") {
        config.cache.redis_url = v;
    }
    if let Some(v) = lookup("RATES_ADMIN_API_KEY") {
        config.admin.api_key = v;
    }

    if let Some(v) = lookup("RATES_CACHE_TTL_SECS") {
        config.cache.ttl_secs = parse_var("RATES_CACHE_TTL_SECS", v)?;
    }
    if let Some(v) = lookup("RATES_CACHE_BACKEND") {
        config.cache.backend = match v.to_ascii_lowercase().as_str() {
            "memory" => CacheBackend::Memory,
            "redis" => CacheBackend::Redis,
            _ => return Err(ConfigError::Env { var: "RATES_CACHE_BACKEND", value: v }),
        };
    }
    if let Some(v) = lookup("RATES_TIMEOUT_MS") {
        config.resilience.timeout_ms = parse_var("RATES_TIMEOUT_MS", v)?;
    }
    if let Some(v) = lookup("RATES_RETRY_MAX_ATTEMPTS") {
        config.resilience.retry.max_attempts = parse_var("RATES_RETRY_MAX_ATTEMPTS", v)?;
    }
    if let Some(v) = lookup("RATES_RETRY_DELAY_MS") {
        config.resilience.retry.delay_ms = parse_var("RATES_RETRY_DELAY_MS", v)?;
    }
    if let Some(v) = lookup("RATES_CB_VOLUME_THRESHOLD") {
        config.resilience.circuit_breaker.request_volume_threshold =
            parse_var("RATES_CB_VOLUME_THRESHOLD", v)?;
    }
    if let Some(v) = lookup("RATES_CB_FAILURE_RATIO") {
        config.resilience.circuit_breaker.failure_ratio = parse_var("RATES_CB_FAILURE_RATIO", v)?;
    }
    if let Some(v) = lookup("RATES_CB_OPEN_DURATION_MS") {
        config.resilience.circuit_breaker.open_duration_ms =
            parse_var("RATES_CB_OPEN_DURATION_MS", v)?;
    }
    if let Some(v) = lookup("RATES_LOG_FORMAT") {
        config.observability.log_format = match v.to_ascii_lowercase().as_str() {
            "pretty" | "text" => LogFormat::Pretty,
            "json" => LogFormat::Json,
            _ => return Err(ConfigError::Env { var: "RATES_LOG_FORMAT", value: v }),
        };
    }

    Ok(())
}

fn parse_var<T: FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    let parsed = value.trim().parse::<T>();
    parsed.map_err(|_| ConfigError::Env { var, value })
}
