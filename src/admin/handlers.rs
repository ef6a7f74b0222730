use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::config::BreakerScope;
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::resilience::BreakerSnapshot;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub cache_ttl_secs: u64,
    pub breaker_scope: BreakerScope,
}

#[derive(Serialize)]
pub struct ResetSummary {
    pub reset: usize,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        cache_ttl_secs: state.config.cache.ttl_secs,
        breaker_scope: state.config.resilience.circuit_breaker.scope,
    })
}

pub async fn get_circuits(State(state): State<AppState>) -> Json<Vec<BreakerSnapshot>> {
    Json(state.breakers.snapshots())
}

pub async fn reset_circuits(State(state): State<AppState>) -> Json<ResetSummary> {
    Json(ResetSummary {
        reset: state.breakers.reset_all(),
    })
}

pub async fn invalidate_cache(
    State(state): State<AppState>,
    Path(currency): Path<String>,
) -> Response {
    match state.rates.invalidate(&currency).await {
        Ok(code) => {
            tracing::info!(currency = %code, "Cache entry invalidated by admin");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}
