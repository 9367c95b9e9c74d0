// =============================================================================
// Application State — shared by every HTTP handler
// =============================================================================
//
// Holds only what outlives a request: the upstream client (and through it the
// used-weight tracker), the pipeline configuration and a few atomic counters.
// Candle data never lives here; each /ohlcv request owns its own store.
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};

use crate::aggregator::RequestOrchestrator;
use crate::binance::BinanceClient;
use crate::config::ServiceConfig;

pub struct AppState {
    pub orchestrator: RequestOrchestrator,
    pub client: BinanceClient,
    pub cors_allowed_origin: String,

    ohlcv_requests: AtomicU64,
    ohlcv_failures: AtomicU64,
}

impl AppState {
    pub fn new(client: BinanceClient, config: &ServiceConfig) -> Self {
        Self {
            orchestrator: RequestOrchestrator::new(client.clone(), config),
            client,
            cors_allowed_origin: config.cors_allowed_origin.clone(),
            ohlcv_requests: AtomicU64::new(0),
            ohlcv_failures: AtomicU64::new(0),
        }
    }

    pub fn record_request(&self, ok: bool) {
        self.ohlcv_requests.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.ohlcv_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// `(requests, failures)` since startup.
    pub fn request_counts(&self) -> (u64, u64) {
        (
            self.ohlcv_requests.load(Ordering::Relaxed),
            self.ohlcv_failures.load(Ordering::Relaxed),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn counts_requests_and_failures() {
        let config = ServiceConfig::default();
        let client = BinanceClient::new(&config.provider_base_url, Duration::from_secs(1)).unwrap();
        let state = AppState::new(client, &config);

        state.record_request(true);
        state.record_request(false);
        state.record_request(true);

        assert_eq!(state.request_counts(), (3, 1));
    }
}
