//! Core rate types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while constructing rate types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuoteError {
    /// Currency code is not three ASCII letters.
    #[error("invalid currency code '{0}'")]
    InvalidCurrency(String),

    /// A rate was below zero.
    #[error("{field} rate must not be negative (got {value})")]
    NegativeRate { field: &'static str, value: Decimal },
}

/// ISO-like three letter currency code, always upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for CurrencyCode {
    type Err = QuoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(QuoteError::InvalidCurrency(s.to_string()));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = QuoteError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A normalized exchange rate quote.
///
/// Fields are private: a `Quote` is validated once in [`Quote::new`] (or on
/// deserialization, which goes through the same checks) and never mutated.
/// `last_update` is the provider's timestamp string, passed through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "QuoteRecord")]
pub struct Quote {
    currency: CurrencyCode,
    name: String,
    buy: Decimal,
    sell: Decimal,
    previous_close: Decimal,
    last_update: String,
}

impl Quote {
    pub fn new(
        currency: CurrencyCode,
        name: impl Into<String>,
        buy: Decimal,
        sell: Decimal,
        previous_close: Decimal,
        last_update: impl Into<String>,
    ) -> Result<Self, QuoteError> {
        for (field, value) in [("buy", buy), ("sell", sell), ("previous close", previous_close)] {
            if value < Decimal::ZERO {
                return Err(QuoteError::NegativeRate { field, value });
            }
        }

        Ok(Self {
            currency,
            name: name.into(),
            buy,
            sell,
            previous_close,
            last_update: last_update.into(),
        })
    }

    pub fn currency(&self) -> &CurrencyCode {
        &self.currency
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn buy(&self) -> Decimal {
        self.buy
    }

    pub fn sell(&self) -> Decimal {
        self.sell
    }

    pub fn previous_close(&self) -> Decimal {
        self.previous_close
    }

    pub fn last_update(&self) -> &str {
        &self.last_update
    }
}

/// Wire shape of a cached quote, validated into a [`Quote`].
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteRecord {
    currency: CurrencyCode,
    name: String,
    buy: Decimal,
    sell: Decimal,
    previous_close: Decimal,
    last_update: String,
}

impl TryFrom<QuoteRecord> for Quote {
    type Error = QuoteError;

    fn try_from(r: QuoteRecord) -> Result<Self, Self::Error> {
        Quote::new(r.currency, r.name, r.buy, r.sell, r.previous_close, r.last_update)
    }
}
