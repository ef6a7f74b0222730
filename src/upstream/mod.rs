//! Upstream rate provider subsystem.
//!
//! # Data Flow
//! ```text
//! RateSource::fetch(currency)
//!     → client.rs (resolve endpoint, single HTTP GET)
//!     → models.rs (decode provider payload, normalize into Quote)
//!     → error.rs (classify failures for the resilience stack)
//! ```
//!
//! A source performs exactly one attempt per call. Timeouts, retries and
//! circuit breaking are layered on top by `crate::resilience`.

pub mod client;
pub mod error;
pub mod models;

use async_trait::async_trait;
use std::sync::Arc;

use crate::rates::{CurrencyCode, Quote};

pub use client::{ClientError, HttpRateClient};
pub use error::{RetryClass, UpstreamError};
pub use models::{ProviderPayload, ProviderQuote};

/// A single-attempt source of exchange rate quotes.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Fetch the latest quote for `currency`.
    async fn fetch(&self, currency: &CurrencyCode) -> Result<Quote, UpstreamError>;

    /// Whether this source can answer for `currency` at all.
    fn supports(&self, _currency: &CurrencyCode) -> bool {
        true
    }

    /// Whether the next call for `currency` would be refused without
    /// reaching the network.
    fn rejects(&self, _currency: &CurrencyCode) -> bool {
        false
    }
}

#[async_trait]
impl<T: RateSource + ?Sized> RateSource for Arc<T> {
    async fn fetch(&self, currency: &CurrencyCode) -> Result<Quote, UpstreamError> {
        (**self).fetch(currency).await
    }

    fn supports(&self, currency: &CurrencyCode) -> bool {
        (**self).supports(currency)
    }

    fn rejects(&self, currency: &CurrencyCode) -> bool {
        (**self).rejects(currency)
    }
}
