// =============================================================================
// Shared types used across the OHLCV aggregator
// =============================================================================

use serde::{Deserialize, Serialize};

/// One entry of the 24h ticker snapshot. Only the fields the ranker needs are
/// kept; everything else in the upstream object is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickerSummary {
    pub symbol: String,
    /// Trading volume in the quote currency, as the decimal string sent by
    /// the exchange.
    pub quote_volume: String,
}

/// A single 1m candlestick for one symbol.
///
/// Price and volume fields stay as the exchange's decimal strings so no
/// precision is lost between upstream and caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandleRecord {
    pub symbol: String,
    pub open_time: i64,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    pub volume: String,
    pub close_time: i64,
    pub quote_asset_volume: String,
    pub number_of_trades: u64,
    pub taker_buy_base_asset_volume: String,
    pub taker_buy_quote_asset_volume: String,
}
