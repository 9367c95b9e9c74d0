// =============================================================================
// Service Configuration — JSON file with per-field defaults + env overrides
// =============================================================================
//
// Every field carries `#[serde(default)]` so a partial (or empty) file loads
// cleanly. A missing file is not fatal: main falls back to defaults with a
// warning. Environment variables are applied last and win over the file.
//
// =============================================================================

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_provider_base_url() -> String {
    "https://api.binance.com/api/v3".to_string()
}

fn default_quote_currency() -> String {
    "USDT".to_string()
}

fn default_top_n() -> usize {
    50
}

fn default_upstream_timeout_ms() -> u64 {
    10_000
}

fn default_request_deadline_ms() -> u64 {
    30_000
}

fn default_cors_allowed_origin() -> String {
    "http://localhost:3000".to_string()
}

// =============================================================================
// ServiceConfig
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Address the HTTP server binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Base URL of the market data REST API, without trailing slash.
    #[serde(default = "default_provider_base_url")]
    pub provider_base_url: String,

    /// Only pairs whose symbol ends with this string are ranked. Matched
    /// case-sensitively and used as given, from the file or the environment.
    #[serde(default = "default_quote_currency")]
    pub quote_currency: String,

    /// How many pairs (by quote volume) get their klines fetched.
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Candles per symbol. `None` leaves it to the provider (500 on Binance).
    #[serde(default)]
    pub kline_limit: Option<u32>,

    /// Timeout for each individual outbound call.
    #[serde(default = "default_upstream_timeout_ms")]
    pub upstream_timeout_ms: u64,

    /// Budget for one whole `/ohlcv` request.
    #[serde(default = "default_request_deadline_ms")]
    pub request_deadline_ms: u64,

    /// Origin allowed by CORS. Credentials are allowed, so this must be a
    /// concrete origin rather than `*`.
    #[serde(default = "default_cors_allowed_origin")]
    pub cors_allowed_origin: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            provider_base_url: default_provider_base_url(),
            quote_currency: default_quote_currency(),
            top_n: default_top_n(),
            kline_limit: None,
            upstream_timeout_ms: default_upstream_timeout_ms(),
            request_deadline_ms: default_request_deadline_ms(),
            cors_allowed_origin: default_cors_allowed_origin(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config from {}", path.display()))?;

        info!(
            path = %path.display(),
            provider = %config.provider_base_url,
            quote_currency = %config.quote_currency,
            top_n = config.top_n,
            "config loaded"
        );

        Ok(config)
    }

    /// Apply `OHLCV_*` overrides. `lookup` is `std::env::var` in production.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(v) = get("OHLCV_BIND_ADDR") {
            self.bind_addr = v;
        }
        if let Some(v) = get("OHLCV_PROVIDER_URL") {
            self.provider_base_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = get("OHLCV_QUOTE_CURRENCY") {
            self.quote_currency = v;
        }
        if let Some(n) = get("OHLCV_TOP_N").and_then(|v| v.parse().ok()) {
            self.top_n = n;
        }
        if let Some(v) = get("OHLCV_CORS_ORIGIN") {
            self.cors_allowed_origin = v;
        }
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream_timeout_ms)
    }

    pub fn request_deadline(&self) -> Duration {
        Duration::from_millis(self.request_deadline_ms)
    }
}
