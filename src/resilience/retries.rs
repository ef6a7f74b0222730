//! Fixed-delay retry around a protected rate source.
//!
//! # Responsibilities
//! - Re-run transient failures up to `max_attempts` total attempts
//! - Stop immediately on not-found, when the breaker rejects the call, or
//!   when the failed attempt itself opened the breaker
//! - Collapse the per-attempt error into a [`FetchError`] for the service
//!
//! # Design Decisions
//! - Fixed delay between attempts, no jitter
//! - `max_attempts` counts the first attempt
//! - The sleep happens outside any lock; a cancelled caller simply stops

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::config::RetryConfig;
use crate::observability::metrics;
use crate::rates::{CurrencyCode, Quote};
use crate::resilience::ProtectedFetch;
use crate::upstream::{RateSource, RetryClass};

/// Why a protected fetch gave up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnavailableReason {
    /// The circuit breaker refused the call.
    CircuitOpen,
    /// Every allowed attempt failed.
    RetriesExhausted { attempts: u32, last_error: String },
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CircuitOpen => write!(f, "circuit open"),
            Self::RetriesExhausted {
                attempts,
                last_error,
            } => write!(f, "gave up after {attempts} attempts: {last_error}"),
        }
    }
}

/// Outcome of a failed protected fetch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("no quote published for {currency}")]
    NotFound { currency: CurrencyCode },

    #[error("{currency} rates unavailable: {reason}")]
    Unavailable {
        currency: CurrencyCode,
        reason: UnavailableReason,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            delay: config.delay(),
        }
    }
}

pub struct WithRetry<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S> WithRetry<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<S: RateSource> ProtectedFetch for WithRetry<S> {
    async fn protected_fetch(&self, currency: &CurrencyCode) -> Result<Quote, FetchError> {
        let mut attempt = 0;

        loop {
            attempt += 1;

            let err = match self.inner.fetch(currency).await {
                Ok(quote) => {
                    metrics::record_upstream_attempt(currency, "success");
                    if attempt > 1 {
                        tracing::info!(currency = %currency, attempt, "Upstream recovered after retry");
                    }
                    return Ok(quote);
                }
                Err(err) => err,
            };
            metrics::record_upstream_attempt(currency, err.outcome_label());

            match err.retry_class() {
                RetryClass::NotFound => {
                    tracing::debug!(currency = %currency, error = %err, "Upstream has no quote");
                    return Err(FetchError::NotFound {
                        currency: currency.clone(),
                    });
                }
                RetryClass::Rejected => {
                    return Err(FetchError::Unavailable {
                        currency: currency.clone(),
                        reason: UnavailableReason::CircuitOpen,
                    });
                }
                RetryClass::Transient if attempt >= self.policy.max_attempts => {
                    tracing::warn!(
                        currency = %currency,
                        attempts = attempt,
                        error = %err,
                        "Upstream retries exhausted"
                    );
                    return Err(FetchError::Unavailable {
                        currency: currency.clone(),
                        reason: UnavailableReason::RetriesExhausted {
                            attempts: attempt,
                            last_error: err.to_string(),
                        },
                    });
                }
                RetryClass::Transient if self.inner.rejects(currency) => {
                    tracing::warn!(
                        currency = %currency,
                        attempts = attempt,
                        error = %err,
                        "Circuit opened, not retrying"
                    );
                    return Err(FetchError::Unavailable {
                        currency: currency.clone(),
                        reason: UnavailableReason::CircuitOpen,
                    });
                }
                RetryClass::Transient => {
                    tracing::warn!(
                        currency = %currency,
                        attempt,
                        delay = ?self.policy.delay,
                        error = %err,
                        "Upstream attempt failed, retrying"
                    );
                    tokio::time::sleep(self.policy.delay).await;
                }
            }
        }
    }

    fn supports(&self, currency: &CurrencyCode) -> bool {
        self.inner.supports(currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::UpstreamError;
    use rust_decimal_macros::dec;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Answers with the scripted statuses in order (200 = quote), repeating the last.
    struct Scripted {
        script: Mutex<VecDeque<u16>>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(script: &[u16]) -> Self {
            Self {
                script: Mutex::new(script.iter().copied().collect()),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RateSource for Scripted {
        async fn fetch(&self, currency: &CurrencyCode) -> Result<Quote, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let status = {
                let mut script = self.script.lock().unwrap();
                if script.len() > 1 {
                    script.pop_front().unwrap()
                } else {
                    script[0]
                }
            };
            match status {
                200 => Ok(Quote::new(currency.clone(), "Dólar", dec!(5.37), dec!(5.38), dec!(5.36), "t").unwrap()),
                0 => Err(UpstreamError::CircuitOpen {
                    currency: currency.clone(),
                }),
                status => Err(UpstreamError::Status {
                    currency: currency.clone(),
                    status,
                    body: String::new(),
                }),
            }
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy::from(&RetryConfig::default())
    }

    fn usd() -> CurrencyCode {
        "USD".parse().unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failure() {
        let retry = WithRetry::new(Scripted::new(&[503, 200]), policy());

        let quote = retry.protected_fetch(&usd()).await.unwrap();
        assert_eq!(quote.buy(), dec!(5.37));
        assert_eq!(retry.inner.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_fault_uses_exact_attempts() {
        let retry = WithRetry::new(Scripted::new(&[500]), policy());
        let start = Instant::now();

        let err = retry.protected_fetch(&usd()).await.unwrap_err();
        match err {
            FetchError::Unavailable {
                reason: UnavailableReason::RetriesExhausted { attempts, last_error },
                ..
            } => {
                assert_eq!(attempts, 3);
                assert!(last_error.contains("500"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(retry.inner.calls(), 3);
        // two fixed delays between three attempts
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(2) && elapsed < Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_is_single_attempt() {
        let retry = WithRetry::new(Scripted::new(&[404]), policy());

        let err = retry.protected_fetch(&usd()).await.unwrap_err();
        assert_eq!(err, FetchError::NotFound { currency: usd() });
        assert_eq!(retry.inner.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejection_stops_retrying() {
        let retry = WithRetry::new(Scripted::new(&[500, 0]), policy());

        let err = retry.protected_fetch(&usd()).await.unwrap_err();
        assert_eq!(
            err,
            FetchError::Unavailable {
                currency: usd(),
                reason: UnavailableReason::CircuitOpen,
            }
        );
        assert_eq!(retry.inner.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tripping_attempt_skips_retry_delay() {
        use crate::config::BreakerScope;
        use crate::resilience::{BreakerRegistry, CircuitBreakerConfig, WithCircuitBreaker};
        use std::sync::Arc;

        let registry = Arc::new(BreakerRegistry::new(
            BreakerScope::PerCurrency,
            CircuitBreakerConfig::default(),
        ));
        let breaker = registry.for_currency(&usd());
        for _ in 0..3 {
            breaker.try_acquire().unwrap().failure();
        }

        let retry = WithRetry::new(
            WithCircuitBreaker::new(Scripted::new(&[500]), Arc::clone(&registry)),
            policy(),
        );
        let start = Instant::now();

        let err = retry.protected_fetch(&usd()).await.unwrap_err();
        assert_eq!(
            err,
            FetchError::Unavailable {
                currency: usd(),
                reason: UnavailableReason::CircuitOpen,
            }
        );
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(breaker.state(), crate::resilience::CircuitState::Open);
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        let config = RetryConfig {
            max_attempts: 0,
            delay_ms: 10,
        };
        assert_eq!(RetryPolicy::from(&config).max_attempts, 1);
    }
}
