//! Public endpoint handlers.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Instant;

use crate::http::request::{request_id, wants_bypass, RateParams};
use crate::http::response::{ApiError, RateResponse};
use crate::http::server::AppState;
use crate::observability::metrics;

/// `GET /exchange/{currency}`
pub async fn get_exchange_rate(
    State(state): State<AppState>,
    Path(currency): Path<String>,
    Query(params): Query<RateParams>,
    headers: HeaderMap,
) -> Response {
    let start = Instant::now();
    let bypass = wants_bypass(&headers, &params);

    tracing::debug!(
        request_id = %request_id(&headers),
        currency = %currency,
        bypass,
        "Exchange rate requested"
    );

    let (label, response) = match state.rates.resolve(&currency) {
        Ok(code) => {
            let response = match state.rates.quote(&code, bypass).await {
                Some(quote) => Json(RateResponse::from(&quote)).into_response(),
                None => ApiError::Unavailable.into_response(),
            };
            (code.to_string(), response)
        }
        Err(e) => ("invalid".to_string(), ApiError::from(e).into_response()),
    };

    metrics::record_request(&label, response.status().as_u16(), start);
    response
}

#[derive(Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
}

/// `GET /health`
pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
