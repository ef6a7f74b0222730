//! Metrics collection and exposition.
//!
//! # Metrics
//! - `rates_requests_total` (counter): inbound rate requests by currency, status
//! - `rates_request_duration_seconds` (histogram): inbound latency
//! - `rates_cache_lookups_total` (counter): cache hits and misses by currency
//! - `rates_upstream_attempts_total` (counter): upstream attempts by currency, outcome
//! - `rates_circuit_state` (gauge): 0=closed, 1=open, 2=half-open, per breaker
//!
//! Without an installed recorder every call here is a no-op, so tests and
//! deployments with metrics disabled pay nothing.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

use crate::rates::CurrencyCode;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Prometheus exporter listening");
    Ok(())
}

pub fn record_request(currency: &str, status: u16, start: Instant) {
    metrics::counter!(
        "rates_requests_total",
        "currency" => currency.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("rates_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_cache_lookup(currency: &CurrencyCode, hit: bool) {
    metrics::counter!(
        "rates_cache_lookups_total",
        "currency" => currency.to_string(),
        "result" => if hit { "hit" } else { "miss" }
    )
    .increment(1);
}

pub fn record_upstream_attempt(currency: &CurrencyCode, outcome: &'static str) {
    metrics::counter!(
        "rates_upstream_attempts_total",
        "currency" => currency.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_circuit_state(breaker: &str, state: u8) {
    metrics::gauge!("rates_circuit_state", "breaker" => breaker.to_string()).set(f64::from(state));
}
