//! Rate Gateway
//!
//! A fetch-through cache for USD/EUR exchange rates, built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────────────┐
//!                        │                    RATE GATEWAY                      │
//!                        │                                                      │
//!   Client Request       │  ┌─────────┐    ┌──────────────┐    ┌────────────┐   │
//!   ─────────────────────┼─▶│  http   │───▶│ RateService  │───▶│ RateCache  │   │
//!                        │  │ server  │    │ (fetch-thru) │    │ mem/redis  │   │
//!                        │  └─────────┘    └──────┬───────┘    └────────────┘   │
//!                        │                        │ miss / bypass               │
//!                        │                        ▼                             │
//!                        │               ┌──────────────────┐                   │
//!                        │               │    resilience    │                   │
//!                        │               │ retry → breaker  │                   │
//!                        │               │    → timeout     │                   │
//!                        │               └────────┬─────────┘                   │
//!                        │                        ▼                             │
//!   Client Response      │               ┌──────────────────┐                   │
//!   ◀────────────────────┼───────────────│ upstream client  │◀──────────────────┼──── Rate
//!                        │               └──────────────────┘                   │     Provider
//!                        │                                                      │
//!                        │  ┌────────────────────────────────────────────────┐  │
//!                        │  │            Cross-Cutting Concerns               │  │
//!                        │  │  config · observability · lifecycle · admin     │  │
//!                        │  └────────────────────────────────────────────────┘  │
//!                        └──────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;

use rate_gateway::config::{self, GatewayConfig};
use rate_gateway::lifecycle::{self, signals, Shutdown, StartupError};
use rate_gateway::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "rate-gateway", version, about = "Fetch-through exchange rate cache")]
struct Args {
    /// TOML config file; defaults plus RATES_* variables when omitted.
    #[arg(short, long, env = "RATES_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let config: GatewayConfig = match &args.config {
        Some(path) => config::load_config(path)?,
        None => config::load_from_env()?,
    };

    logging::init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "rate-gateway starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        cache_ttl_secs = config.cache.ttl_secs,
        timeout_ms = config.resilience.timeout_ms,
        max_attempts = config.resilience.retry.max_attempts,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::Address(config.observability.metrics_address.clone()))?;
        metrics::init_metrics(addr).map_err(StartupError::from)?;
    }

    let state = lifecycle::build_state(config).await?;

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());
    lifecycle::serve(state, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
