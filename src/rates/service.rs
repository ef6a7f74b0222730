//! Fetch-through rate service.
//!
//! # Algorithm
//! ```text
//! get_rate(currency, bypass)
//!     → parse + support check (contract errors only)
//!     → unless bypass: RateCache::get → hit? return it
//!     → ProtectedFetch::protected_fetch
//!         ok  → RateCache::set (best effort) → Some(quote)
//!         err → None, cache untouched
//! ```
//!
//! Upstream and cache failures never surface as errors here; the caller sees
//! either a complete quote or an explicit absence.

use std::sync::Arc;
use thiserror::Error;

use crate::cache::RateCache;
use crate::rates::types::{CurrencyCode, Quote};
use crate::resilience::ProtectedFetch;

/// Requests the service refuses to serve at all.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RateError {
    #[error("'{0}' is not a currency code")]
    InvalidCurrency(String),

    #[error("currency {0} is not supported")]
    UnsupportedCurrency(CurrencyCode),
}

#[derive(Clone)]
pub struct RateService {
    cache: RateCache,
    fetcher: Arc<dyn ProtectedFetch>,
}

impl RateService {
    pub fn new(cache: RateCache, fetcher: Arc<dyn ProtectedFetch>) -> Self {
        Self { cache, fetcher }
    }

    /// Normalize `raw` and check it has an upstream endpoint.
    pub fn resolve(&self, raw: &str) -> Result<CurrencyCode, RateError> {
        let currency: CurrencyCode = raw
            .parse()
            .map_err(|_| RateError::InvalidCurrency(raw.to_string()))?;

        if !self.fetcher.supports(&currency) {
            return Err(RateError::UnsupportedCurrency(currency));
        }
        Ok(currency)
    }

    /// Current quote for `currency`, from cache unless `bypass_cache`.
    ///
    /// `Ok(None)` means the rate is unavailable right now (not found upstream,
    /// retries exhausted or circuit open).
    pub async fn get_rate(
        &self,
        currency: &str,
        bypass_cache: bool,
    ) -> Result<Option<Quote>, RateError> {
        let currency = self.resolve(currency)?;
        Ok(self.quote(&currency, bypass_cache).await)
    }

    /// Same as [`get_rate`](Self::get_rate) for an already resolved currency.
    pub async fn quote(&self, currency: &CurrencyCode, bypass_cache: bool) -> Option<Quote> {
        if !bypass_cache {
            if let Some(quote) = self.cache.get(currency).await {
                tracing::debug!(currency = %currency, "Serving cached quote");
                return Some(quote);
            }
        }

        match self.fetcher.protected_fetch(currency).await {
            Ok(quote) => {
                self.cache.set(currency, &quote).await;
                tracing::debug!(currency = %currency, bypass_cache, "Fetched fresh quote");
                Some(quote)
            }
            Err(e) => {
                tracing::warn!(currency = %currency, error = %e, "Rate unavailable");
                None
            }
        }
    }

    /// Remove the cached quote for `currency`.
    pub async fn invalidate(&self, currency: &str) -> Result<CurrencyCode, RateError> {
        let currency = self.resolve(currency)?;
        self.cache.invalidate(&currency).await;
        Ok(currency)
    }
}
