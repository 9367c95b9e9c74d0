// =============================================================================
// OHLCV Aggregator — Main Entry Point
// =============================================================================
//
// Serves `GET /ohlcv`: 1m klines for the top pairs by 24h quote volume,
// fetched concurrently from the Binance REST API on every request.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod aggregator;
mod api;
mod app_state;
mod binance;
mod config;
mod error;
mod types;

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::binance::BinanceClient;
use crate::config::ServiceConfig;

const DEFAULT_CONFIG_PATH: &str = "ohlcv_config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path =
        std::env::var("OHLCV_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let mut config = ServiceConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        ServiceConfig::default()
    });
    config.apply_overrides(|key| std::env::var(key).ok());

    info!(
        provider = %config.provider_base_url,
        quote_currency = %config.quote_currency,
        top_n = config.top_n,
        kline_limit = ?config.kline_limit,
        upstream_timeout_ms = config.upstream_timeout_ms,
        request_deadline_ms = config.request_deadline_ms,
        cors_origin = %config.cors_allowed_origin,
        "OHLCV aggregator starting"
    );

    // ── 2. Upstream client & shared state ────────────────────────────────
    let client = BinanceClient::new(&config.provider_base_url, config.upstream_timeout())
        .context("failed to build HTTP client")?;
    let state = Arc::new(AppState::new(client, &config));

    // ── 3. API server ────────────────────────────────────────────────────
    let app = api::rest::router(state)?;
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server failed")?;

    info!("OHLCV aggregator shut down complete.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    warn!("Shutdown signal received — stopping gracefully");
}
