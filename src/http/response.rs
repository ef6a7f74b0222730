//! Response bodies and error-to-status mapping.
//!
//! | Outcome | Status |
//! |---------|--------|
//! | quote | 200 |
//! | malformed currency code | 400 |
//! | unsupported currency | 404 |
//! | rate absent (not found upstream, retries exhausted, circuit open) | 503 |

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::rates::{Quote, RateError};

/// Public rate representation. Rates are JSON numbers.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateResponse {
    pub currency_code: String,
    pub currency_name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub buy_rate: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub sell_rate: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub previous_close_rate: Decimal,
    pub last_update: String,
}

impl From<&Quote> for RateResponse {
    fn from(quote: &Quote) -> Self {
        Self {
            currency_code: quote.currency().to_string(),
            currency_name: quote.name().to_string(),
            buy_rate: quote.buy(),
            sell_rate: quote.sell(),
            previous_close_rate: quote.previous_close(),
            last_update: quote.last_update().to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Errors returned by the public API.
#[derive(Debug)]
pub enum ApiError {
    /// The rate could not be produced right now.
    Unavailable,
    Rate(RateError),
}

impl From<RateError> for ApiError {
    fn from(err: RateError) -> Self {
        Self::Rate(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Rate(RateError::InvalidCurrency(_)) => StatusCode::BAD_REQUEST,
            Self::Rate(RateError::UnsupportedCurrency(_)) => StatusCode::NOT_FOUND,
        }
    }

    fn body(&self) -> ErrorResponse {
        match self {
            Self::Unavailable => ErrorResponse {
                error: "Exchange rate service unavailable".into(),
                message: "Unable to retrieve exchange rates at this time".into(),
            },
            Self::Rate(e @ RateError::InvalidCurrency(_)) => ErrorResponse {
                error: "Invalid currency".into(),
                message: e.to_string(),
            },
            Self::Rate(e @ RateError::UnsupportedCurrency(_)) => ErrorResponse {
                error: "Unsupported currency".into(),
                message: e.to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}
