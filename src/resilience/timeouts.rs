//! Per-attempt deadline around a rate source.
//!
//! Every upstream attempt gets its own deadline. A timed out attempt is an
//! ordinary transient failure: it is retried and counted by the breaker.

use async_trait::async_trait;
use std::time::Duration;

use crate::rates::{CurrencyCode, Quote};
use crate::upstream::{RateSource, UpstreamError};

/// Wraps a source so no single attempt outlives `timeout`.
#[derive(Debug, Clone)]
pub struct WithTimeout<S> {
    inner: S,
    timeout: Duration,
}

impl<S> WithTimeout<S> {
    pub fn new(inner: S, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl<S: RateSource> RateSource for WithTimeout<S> {
    async fn fetch(&self, currency: &CurrencyCode) -> Result<Quote, UpstreamError> {
        match tokio::time::timeout(self.timeout, self.inner.fetch(currency)).await {
            Ok(result) => result,
            Err(_) => Err(UpstreamError::Timeout {
                currency: currency.clone(),
                after: self.timeout,
            }),
        }
    }

    fn supports(&self, currency: &CurrencyCode) -> bool {
        self.inner.supports(currency)
    }

    fn rejects(&self, currency: &CurrencyCode) -> bool {
        self.inner.rejects(currency)
    }
}
