//! Provider payload models.
//!
//! The provider answers with Portuguese field names. Some endpoints return a
//! bare object, others a single-element array; both are accepted. `nome` is
//! optional and falls back to the currency code.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::rates::{CurrencyCode, Quote};
use crate::upstream::error::UpstreamError;

/// One quotation as published by the provider.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderQuote {
    /// Currency code, e.g. "EUR".
    pub moeda: String,
    /// Display name, e.g. "Euro".
    #[serde(default)]
    pub nome: Option<String>,
    /// Buy rate.
    pub compra: Decimal,
    /// Sell rate.
    pub venda: Decimal,
    /// Previous close rate.
    pub fecho_anterior: Decimal,
    /// Provider timestamp, kept verbatim.
    pub data_atualizacao: String,
}

#[derive(Debug)]
pub enum ProviderPayload {
    Single(ProviderQuote),
    List(Vec<ProviderQuote>),
}

impl ProviderPayload {
    /// Parse a raw response body.
    ///
    /// The shape is picked from the first significant byte so serde's
    /// field-level error survives into the decode reason.
    pub fn parse(currency: &CurrencyCode, body: &[u8]) -> Result<Self, UpstreamError> {
        let decode = |e: serde_json::Error| UpstreamError::Decode {
            currency: currency.clone(),
            reason: e.to_string(),
        };

        match body.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b'[') => serde_json::from_slice(body).map(Self::List).map_err(decode),
            _ => serde_json::from_slice(body).map(Self::Single).map_err(decode),
        }
    }

    /// Normalize into a [`Quote`] for the requested currency.
    pub fn into_quote(self, currency: &CurrencyCode) -> Result<Quote, UpstreamError> {
        let raw = match self {
            Self::Single(q) => q,
            Self::List(list) => list.into_iter().next().ok_or_else(|| UpstreamError::NoQuote {
                currency: currency.clone(),
            })?,
        };
        raw.into_quote(currency)
    }
}

impl ProviderQuote {
    fn into_quote(self, currency: &CurrencyCode) -> Result<Quote, UpstreamError> {
        let decode = |reason: String| UpstreamError::Decode {
            currency: currency.clone(),
            reason,
        };

        let published: CurrencyCode = self.moeda.parse().map_err(|e| decode(format!("{e}")))?;
        if &published != currency {
            return Err(decode(format!("payload is for {published}")));
        }

        let name = self
            .nome
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| published.to_string());

        Quote::new(
            published,
            name,
            self.compra,
            self.venda,
            self.fecho_anterior,
            self.data_atualizacao,
        )
        .map_err(|e| decode(e.to_string()))
    }
}
