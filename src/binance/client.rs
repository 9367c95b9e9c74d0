// =============================================================================
// Binance REST API Client — public market data endpoints
// =============================================================================
//
// Only unsigned endpoints are used, so no API key is configured. The client
// returns raw response bodies; shaping them into typed records is the job of
// the aggregator modules, which keeps that validation testable without I/O.
//
// Every response (success or not) feeds the used-weight tracker.
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument};

use crate::binance::rate_limit::UsedWeightTracker;
use crate::error::UpstreamError;

pub const TICKER_ENDPOINT: &str = "ticker/24hr";
pub const KLINES_ENDPOINT: &str = "klines";

/// Longest slice of an error body carried into an error message.
const ERROR_BODY_EXCERPT: usize = 200;

#[derive(Clone)]
pub struct BinanceClient {
    base_url: String,
    client: reqwest::Client,
    weight: Arc<UsedWeightTracker>,
}

impl BinanceClient {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Create a client for `base_url` (e.g. `https://api.binance.com/api/v3`)
    /// with `timeout` applied to every call.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        debug!(base_url = %base_url, timeout_ms = timeout.as_millis() as u64, "BinanceClient initialised");

        Ok(Self {
            base_url,
            client,
            weight: Arc::new(UsedWeightTracker::new()),
        })
    }

    pub fn weight(&self) -> &UsedWeightTracker {
        &self.weight
    }

    // -------------------------------------------------------------------------
    // Public market data
    // -------------------------------------------------------------------------

    /// GET /ticker/24hr for every symbol on the exchange.
    #[instrument(skip(self), name = "binance::get_ticker_24hr")]
    pub async fn get_ticker_24hr(&self) -> Result<String, UpstreamError> {
        self.get_text(TICKER_ENDPOINT, &[]).await
    }

    /// GET /klines for one symbol.
    ///
    /// The response is an array of arrays:
    ///   [0] openTime, [1] open, [2] high, [3] low, [4] close, [5] volume,
    ///   [6] closeTime, [7] quoteAssetVolume, [8] numberOfTrades,
    ///   [9] takerBuyBaseVolume, [10] takerBuyQuoteVolume, [11] ignore
    #[instrument(skip(self), name = "binance::get_klines")]
    pub async fn get_klines(
        &self,
        symbol: &str,
        interval: &str,
        limit: Option<u32>,
    ) -> Result<String, UpstreamError> {
        let mut query = vec![
            ("symbol", symbol.to_string()),
            ("interval", interval.to_string()),
        ];
        if let Some(l) = limit {
            query.push(("limit", l.to_string()));
        }
        self.get_text(KLINES_ENDPOINT, &query).await
    }

    // -------------------------------------------------------------------------
    // Internal helpers
    // -------------------------------------------------------------------------

    async fn get_text(
        &self,
        endpoint: &'static str,
        query: &[(&str, String)],
    ) -> Result<String, UpstreamError> {
        let url = format!("{}/{}", self.base_url, endpoint);

        let resp = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| UpstreamError::from_reqwest(endpoint, e))?;

        self.weight.update_from_headers(resp.headers());

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| UpstreamError::from_reqwest(endpoint, e))?;

        if !status.is_success() {
            let excerpt: String = body.chars().take(ERROR_BODY_EXCERPT).collect();
            return Err(UpstreamError::Unavailable {
                endpoint,
                reason: format!("status {status}: {excerpt}"),
            });
        }

        debug!(endpoint, bytes = body.len(), "upstream response received");
        Ok(body)
    }
}

impl std::fmt::Debug for BinanceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinanceClient")
            .field("base_url", &self.base_url)
            .field("weight", &self.weight)
            .finish()
    }
}
