// =============================================================================
// Ticker Snapshot — 24h statistics for every pair, filtered by quote currency
// =============================================================================

use tracing::{debug, info, warn};

use crate::binance::client::TICKER_ENDPOINT;
use crate::binance::BinanceClient;
use crate::error::UpstreamError;
use crate::types::TickerSummary;

#[derive(Debug, Clone)]
pub struct TickerSnapshotFetcher {
    client: BinanceClient,
}

impl TickerSnapshotFetcher {
    pub fn new(client: BinanceClient) -> Self {
        Self { client }
    }

    /// Fetch the snapshot and keep only pairs quoted in `quote_currency`.
    ///
    /// Single attempt: any transport or shape failure is returned as is.
    pub async fn fetch(&self, quote_currency: &str) -> Result<Vec<TickerSummary>, UpstreamError> {
        let body = self.client.get_ticker_24hr().await.inspect_err(|e| {
            warn!(error = %e, "failed to fetch ticker snapshot");
        })?;

        let all = parse_tickers(&body).inspect_err(|e| {
            warn!(error = %e, "failed to parse ticker snapshot");
        })?;
        let total = all.len();

        let filtered = filter_by_quote(all, quote_currency);
        info!(
            total,
            kept = filtered.len(),
            quote_currency,
            "ticker snapshot fetched"
        );
        Ok(filtered)
    }
}

/// Parse the ticker endpoint body. Must be a JSON array of objects carrying
/// string `symbol` and `quoteVolume` fields.
pub fn parse_tickers(body: &str) -> Result<Vec<TickerSummary>, UpstreamError> {
    serde_json::from_str(body).map_err(|e| UpstreamError::Malformed {
        endpoint: TICKER_ENDPOINT,
        reason: e.to_string(),
    })
}

/// Exact, case-sensitive suffix match on the symbol.
pub fn filter_by_quote(tickers: Vec<TickerSummary>, quote_currency: &str) -> Vec<TickerSummary> {
    let kept: Vec<TickerSummary> = tickers
        .into_iter()
        .filter(|t| t.symbol.ends_with(quote_currency))
        .collect();
    debug!(quote_currency, kept = kept.len(), "tickers filtered by quote currency");
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn ticker(symbol: &str, vol: &str) -> TickerSummary {
        TickerSummary {
            symbol: symbol.into(),
            quote_volume: vol.into(),
        }
    }

    #[test]
    fn filter_is_exact_suffix_and_case_sensitive() {
        let input = vec![
            ticker("BTCUSDT", "1"),
            ticker("ETHBTC", "1"),
            ticker("usdtBTC", "1"),
            ticker("SOLusdt", "1"),
            ticker("BNBUSDT", "1"),
        ];
        let kept: Vec<String> = filter_by_quote(input, "USDT")
            .into_iter()
            .map(|t| t.symbol)
            .collect();
        assert_eq!(kept, vec!["BTCUSDT", "BNBUSDT"]);
    }

    #[test]
    fn parse_rejects_non_array_body() {
        let err = parse_tickers(r#"{"code":-1121,"msg":"Invalid symbol."}"#).unwrap_err();
        assert!(matches!(err, UpstreamError::Malformed { .. }));
    }

    #[test]
    fn parse_rejects_missing_quote_volume() {
        let err = parse_tickers(r#"[{"symbol":"BTCUSDT"}]"#).unwrap_err();
        assert!(matches!(err, UpstreamError::Malformed { .. }));
    }

    #[test]
    fn parse_rejects_invalid_json() {
        assert!(parse_tickers("not json").is_err());
    }

    #[tokio::test]
    async fn fetch_filters_to_quote_currency() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/ticker/24hr")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[{"symbol":"BTCUSDT","quoteVolume":"1000000"},{"symbol":"ETHBTC","quoteVolume":"500"}]"#,
            )
            .create_async()
            .await;

        let client = BinanceClient::new(server.url(), Duration::from_secs(5)).unwrap();
        let tickers = TickerSnapshotFetcher::new(client).fetch("USDT").await.unwrap();

        assert_eq!(tickers, vec![ticker("BTCUSDT", "1000000")]);
    }

    #[tokio::test]
    async fn fetch_surfaces_malformed_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/ticker/24hr")
            .with_status(200)
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;

        let client = BinanceClient::new(server.url(), Duration::from_secs(5)).unwrap();
        let err = TickerSnapshotFetcher::new(client).fetch("USDT").await.unwrap_err();
        assert!(matches!(err, UpstreamError::Malformed { .. }));
    }
}
