//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML), or defaults
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (RATES_* environment overrides)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_from_env, ConfigError};
pub use schema::{
    AdminConfig, BreakerScope, CacheBackend, CacheConfig, CircuitBreakerSettings, GatewayConfig,
    ListenerConfig, LogFormat, ObservabilityConfig, ResilienceConfig, RetryConfig, TimeoutConfig,
    UpstreamConfig,
};
pub use validation::ValidationError;
