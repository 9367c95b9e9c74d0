// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
//   GET /ohlcv   — aggregated 1m klines for the top pairs by quote volume
//   GET /health  — liveness plus upstream request weight
//
// CORS allows one configured origin with credentials, so the origin must be
// concrete (browsers reject `*` together with credentials).
// =============================================================================

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{Json, State},
    http::{header, HeaderValue, Method},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::app_state::AppState;
use crate::binance::rate_limit::WEIGHT_LIMIT_1M;
use crate::error::ApiError;
use crate::types::CandleRecord;

// =============================================================================
// Router construction
// =============================================================================

/// Build the router with CORS, request tracing and shared state.
pub fn router(state: Arc<AppState>) -> Result<Router> {
    let origin = HeaderValue::from_str(&state.cors_allowed_origin)
        .with_context(|| format!("invalid CORS origin {:?}", state.cors_allowed_origin))?;

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true);

    Ok(Router::new()
        .route("/ohlcv", get(ohlcv))
        .route("/health", get(health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

// =============================================================================
// OHLCV
// =============================================================================

async fn ohlcv(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CandleRecord>>, ApiError> {
    match state.orchestrator.run().await {
        Ok(records) => {
            state.record_request(true);
            Ok(Json(records))
        }
        Err(e) => {
            state.record_request(false);
            error!(error = %e, "ohlcv request failed at ticker snapshot");
            Err(ApiError::TickerSnapshot(e))
        }
    }
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    server_time: i64,
    used_weight_1m: u32,
    weight_limit_1m: u32,
    ohlcv_requests: u64,
    ohlcv_failures: u64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (requests, failures) = state.request_counts();
    Json(HealthResponse {
        status: "ok",
        server_time: chrono::Utc::now().timestamp_millis(),
        used_weight_1m: state.client.weight().used_weight_1m(),
        weight_limit_1m: WEIGHT_LIMIT_1M,
        ohlcv_requests: requests,
        ohlcv_failures: failures,
    })
}

// =============================================================================
// Tests
// =============================================================================
