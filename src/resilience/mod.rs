//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! ProtectedFetch::protected_fetch(currency)
//!     → retries.rs (fixed-delay retry, stop on not-found / rejection)
//!     → circuit_breaker.rs (admit or reject, record outcome)
//!     → timeouts.rs (per-attempt deadline)
//!     → upstream RateSource (one HTTP call)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every upstream attempt has a deadline
//! - The breaker sits inside the retry loop, so every attempt is counted
//!   and an opened breaker ends the loop early
//! - All resilience logic composes as `RateSource` decorators

pub mod circuit_breaker;
pub mod retries;
pub mod timeouts;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::ResilienceConfig;
use crate::rates::{CurrencyCode, Quote};
use crate::upstream::RateSource;

pub use circuit_breaker::{
    BreakerRegistry, BreakerSnapshot, CallPermit, CircuitBreaker, CircuitBreakerConfig,
    CircuitState, WithCircuitBreaker,
};
pub use retries::{FetchError, RetryPolicy, UnavailableReason, WithRetry};
pub use timeouts::WithTimeout;

/// An upstream fetch with the full resilience policy applied.
#[async_trait]
pub trait ProtectedFetch: Send + Sync {
    async fn protected_fetch(&self, currency: &CurrencyCode) -> Result<Quote, FetchError>;

    /// Whether the underlying source knows `currency`.
    fn supports(&self, currency: &CurrencyCode) -> bool;
}

/// The full stack used in production.
pub type Protected<S> = WithRetry<WithCircuitBreaker<WithTimeout<S>>>;

/// Wrap `source` as retry(breaker(timeout(source))).
pub fn protect<S: RateSource>(
    source: S,
    config: &ResilienceConfig,
    breakers: Arc<BreakerRegistry>,
) -> Protected<S> {
    let timed = WithTimeout::new(source, config.timeout());
    let guarded = WithCircuitBreaker::new(timed, breakers);
    WithRetry::new(guarded, RetryPolicy::from(&config.retry))
}
