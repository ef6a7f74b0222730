//! Single-attempt upstream errors and their retry classification.

use std::time::Duration;
use thiserror::Error;

use crate::rates::CurrencyCode;

/// How the resilience stack should treat a failed attempt.
///
/// | Class | Retried? | Circuit breaker penalty? |
/// |-------|----------|--------------------------|
/// | `NotFound` | No | No |
/// | `Transient` | Yes | Yes |
/// | `Rejected` | No | No (breaker already open) |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// The provider has no data for this currency.
    NotFound,
    /// Network, timeout, status or decode fault of one attempt.
    Transient,
    /// The circuit breaker refused the call before it reached the network.
    Rejected,
}

/// Failure of one call to the upstream provider.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Non-2xx HTTP response.
    #[error("upstream responded {status} for {currency}")]
    Status {
        currency: CurrencyCode,
        status: u16,
        body: String,
    },

    /// Connection refused, reset, DNS failure and friends.
    #[error("transport error fetching {currency}: {source}")]
    Transport {
        currency: CurrencyCode,
        #[source]
        source: reqwest::Error,
    },

    /// Body did not match the provider schema.
    #[error("malformed {currency} payload: {reason}")]
    Decode { currency: CurrencyCode, reason: String },

    /// The provider answered with an empty quote list.
    #[error("provider returned no quote for {currency}")]
    NoQuote { currency: CurrencyCode },

    /// No endpoint is configured for the currency.
    #[error("no upstream endpoint configured for {currency}")]
    NoEndpoint { currency: CurrencyCode },

    #[error("upstream call for {currency} timed out after {after:?}")]
    Timeout {
        currency: CurrencyCode,
        after: Duration,
    },

    #[error("circuit open for {currency}")]
    CircuitOpen { currency: CurrencyCode },
}

impl UpstreamError {
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::Status { status: 404, .. } | Self::NoQuote { .. } | Self::NoEndpoint { .. } => {
                RetryClass::NotFound
            }
            Self::CircuitOpen { .. } => RetryClass::Rejected,
            Self::Status { .. }
            | Self::Transport { .. }
            | Self::Decode { .. }
            | Self::Timeout { .. } => RetryClass::Transient,
        }
    }

    /// HTTP status of the failed response, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport { source, .. } => source.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Short label used for metrics.
    pub fn outcome_label(&self) -> &'static str {
        match self {
            Self::Status { status: 404, .. } | Self::NoQuote { .. } | Self::NoEndpoint { .. } => {
                "not_found"
            }
            Self::Status { .. } => "bad_status",
            Self::Transport { .. } => "transport",
            Self::Decode { .. } => "decode",
            Self::Timeout { .. } => "timeout",
            Self::CircuitOpen { .. } => "rejected",
        }
    }
}
