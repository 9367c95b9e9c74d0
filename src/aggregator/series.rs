// =============================================================================
// Series Fetcher — 1m klines for one symbol into the shared store
// =============================================================================
//
// Binance returns klines as positional arrays of mixed JSON types. Each row is
// validated on its own: a short row or a field of the wrong type drops that
// row only. A failed call or an unparsable body drops the symbol only. Nothing
// here can fail the request as a whole.
// =============================================================================

use serde_json::Value;
use tracing::{debug, warn};

use crate::aggregator::store::AggregationStore;
use crate::binance::client::KLINES_ENDPOINT;
use crate::binance::BinanceClient;
use crate::error::{RowSkip, UpstreamError};
use crate::types::CandleRecord;

/// Candle granularity requested from the provider.
pub const KLINE_INTERVAL: &str = "1m";

/// Minimum number of positional elements in a kline row.
const KLINE_FIELDS: usize = 11;

#[derive(Debug, Clone)]
pub struct SeriesFetcher {
    client: BinanceClient,
    limit: Option<u32>,
}

impl SeriesFetcher {
    pub fn new(client: BinanceClient, limit: Option<u32>) -> Self {
        Self { client, limit }
    }

    /// Fetch and parse the series for `symbol`. Failures are logged and give
    /// an empty vector.
    pub async fn fetch_series(&self, symbol: &str) -> Vec<CandleRecord> {
        let body = match self
            .client
            .get_klines(symbol, KLINE_INTERVAL, self.limit)
            .await
        {
            Ok(b) => b,
            Err(e) => {
                warn!(symbol, error = %e, "failed to fetch klines, skipping symbol");
                return Vec::new();
            }
        };

        match parse_series(symbol, &body) {
            Ok(records) => records,
            Err(e) => {
                warn!(symbol, error = %e, "failed to parse klines, skipping symbol");
                Vec::new()
            }
        }
    }

    /// Fetch `symbol` and append every record to `store`. Returns how many
    /// records were appended.
    pub async fn collect_into(&self, symbol: &str, store: &AggregationStore) -> usize {
        let records = self.fetch_series(symbol).await;
        let n = records.len();
        for record in records {
            store.append(record);
        }
        debug!(symbol, records = n, store_total = store.len(), "series collected");
        n
    }
}

/// Parse a whole klines body. Only a body that is not a JSON array is an
/// error; bad rows are skipped.
pub fn parse_series(symbol: &str, body: &str) -> Result<Vec<CandleRecord>, UpstreamError> {
    let value: Value = serde_json::from_str(body).map_err(|e| UpstreamError::Malformed {
        endpoint: KLINES_ENDPOINT,
        reason: e.to_string(),
    })?;

    let rows = value.as_array().ok_or_else(|| UpstreamError::Malformed {
        endpoint: KLINES_ENDPOINT,
        reason: "expected a JSON array".to_string(),
    })?;

    let mut records = Vec::with_capacity(rows.len());
    let mut skipped = 0usize;
    for (i, row) in rows.iter().enumerate() {
        match parse_row(symbol, row) {
            Ok(rec) => records.push(rec),
            Err(reason) => {
                skipped += 1;
                debug!(symbol, row = i, %reason, "skipping kline row");
            }
        }
    }

    if skipped > 0 {
        warn!(symbol, skipped, kept = records.len(), "some kline rows were skipped");
    }
    Ok(records)
}

/// Turn one positional kline row into a record.
pub fn parse_row(symbol: &str, row: &Value) -> Result<CandleRecord, RowSkip> {
    let arr = row.as_array().ok_or(RowSkip::NotAnArray)?;
    if arr.len() < KLINE_FIELDS {
        return Err(RowSkip::TooShort { len: arr.len() });
    }

    let number_of_trades = int_at(arr, 8, "numberOfTrades")?;
    let number_of_trades = u64::try_from(number_of_trades).map_err(|_| RowSkip::FieldType {
        index: 8,
        field: "numberOfTrades",
    })?;

    Ok(CandleRecord {
        symbol: symbol.to_string(),
        open_time: int_at(arr, 0, "openTime")?,
        open: str_at(arr, 1, "open")?,
        high: str_at(arr, 2, "high")?,
        low: str_at(arr, 3, "low")?,
        close: str_at(arr, 4, "close")?,
        volume: str_at(arr, 5, "volume")?,
        close_time: int_or_str_at(arr, 6, "closeTime")?,
        quote_asset_volume: str_at(arr, 7, "quoteAssetVolume")?,
        number_of_trades,
        taker_buy_base_asset_volume: str_at(arr, 9, "takerBuyBaseAssetVolume")?,
        taker_buy_quote_asset_volume: str_at(arr, 10, "takerBuyQuoteAssetVolume")?,
    })
}

/// Decimal fields must arrive as JSON strings.
fn str_at(arr: &[Value], index: usize, field: &'static str) -> Result<String, RowSkip> {
    arr[index]
        .as_str()
        .map(str::to_string)
        .ok_or(RowSkip::FieldType { index, field })
}

/// Integer fields accept a JSON integer or an integral float.
fn int_at(arr: &[Value], index: usize, field: &'static str) -> Result<i64, RowSkip> {
    let v = &arr[index];
    let parsed = if let Some(i) = v.as_i64() {
        Some(i)
    } else {
        v.as_f64()
            .filter(|f| f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| f as i64)
    };
    parsed.ok_or(RowSkip::FieldType { index, field })
}

/// Close time is also seen as a string holding an integer.
fn int_or_str_at(arr: &[Value], index: usize, field: &'static str) -> Result<i64, RowSkip> {
    match arr[index].as_str() {
        Some(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| RowSkip::FieldType { index, field }),
        None => int_at(arr, index, field),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    const SAMPLE_ROW: &str = r#"[1600000000000,"1.0","2.0","0.5","1.5","100","1600000059999","150.0",10,"50","75"]"#;

    #[test]
    fn parses_reference_row() {
        let records = parse_series("BTCUSDT", &format!("[{SAMPLE_ROW}]")).unwrap();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.symbol, "BTCUSDT");
        assert_eq!(r.open_time, 1_600_000_000_000);
        assert_eq!(r.open, "1.0");
        assert_eq!(r.high, "2.0");
        assert_eq!(r.low, "0.5");
        assert_eq!(r.close, "1.5");
        assert_eq!(r.volume, "100");
        assert_eq!(r.close_time, 1_600_000_059_999);
        assert_eq!(r.quote_asset_volume, "150.0");
        assert_eq!(r.number_of_trades, 10);
        assert_eq!(r.taker_buy_base_asset_volume, "50");
        assert_eq!(r.taker_buy_quote_asset_volume, "75");
    }

    #[test]
    fn decimal_strings_are_not_reformatted() {
        let row = json!([1, "0.00001234", "1.10000000", "0", "1e-8", "12345678901234567890.1", 2, "3", 4, "5", "6"]);
        let r = parse_row("X", &row).unwrap();
        assert_eq!(r.open, "0.00001234");
        assert_eq!(r.high, "1.10000000");
        assert_eq!(r.close, "1e-8");
        assert_eq!(r.volume, "12345678901234567890.1");
    }

    #[test]
    fn short_row_is_skipped_and_rest_processed() {
        let body = format!(r#"[[1600000000000,"1.0","2.0"],{SAMPLE_ROW},[]]"#);
        let records = parse_series("ETHUSDT", &body).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].symbol, "ETHUSDT");
    }

    #[test]
    fn row_skip_reasons() {
        assert_eq!(parse_row("X", &json!({"a": 1})), Err(RowSkip::NotAnArray));
        assert_eq!(
            parse_row("X", &json!([1, "2", "3"])),
            Err(RowSkip::TooShort { len: 3 })
        );
        assert_eq!(
            parse_row("X", &json!([1, 1.0, "2", "3", "4", "5", 6, "7", 8, "9", "10"])),
            Err(RowSkip::FieldType { index: 1, field: "open" })
        );
        assert_eq!(
            parse_row("X", &json!(["soon", "1", "2", "3", "4", "5", 6, "7", 8, "9", "10"])),
            Err(RowSkip::FieldType { index: 0, field: "openTime" })
        );
        assert_eq!(
            parse_row("X", &json!([0, "1", "2", "3", "4", "5", 6, "7", -1, "9", "10"])),
            Err(RowSkip::FieldType { index: 8, field: "numberOfTrades" })
        );
        assert_eq!(
            parse_row("X", &json!([0, "1", "2", "3", "4", "5", 6, "7", 1.5, "9", "10"])),
            Err(RowSkip::FieldType { index: 8, field: "numberOfTrades" })
        );
    }

    #[test]
    fn integral_float_times_are_accepted() {
        let row = json!([1600000000000.0, "1", "2", "3", "4", "5", "6", "7", 8.0, "9", "10", "0"]);
        let r = parse_row("X", &row).unwrap();
        assert_eq!(r.open_time, 1_600_000_000_000);
        assert_eq!(r.close_time, 6);
        assert_eq!(r.number_of_trades, 8);
    }

    #[test]
    fn only_close_time_accepts_integer_strings() {
        assert_eq!(
            parse_row("X", &json!(["1600000000000", "1", "2", "3", "4", "5", 6, "7", 8, "9", "10"])),
            Err(RowSkip::FieldType { index: 0, field: "openTime" })
        );
        assert_eq!(
            parse_row("X", &json!([0, "1", "2", "3", "4", "5", 6, "7", "12", "9", "10"])),
            Err(RowSkip::FieldType { index: 8, field: "numberOfTrades" })
        );
        assert_eq!(
            parse_row("X", &json!([0, "1", "2", "3", "4", "5", "later", "7", 8, "9", "10"])),
            Err(RowSkip::FieldType { index: 6, field: "closeTime" })
        );
        let r = parse_row("X", &json!([0, "1", "2", "3", "4", "5", " 59999 ", "7", 8, "9", "10"])).unwrap();
        assert_eq!(r.close_time, 59_999);
    }

    #[test]
    fn type_mismatch_skips_only_that_row() {
        let body = format!(
            r#"[[1,"1","2","3","4","5",6,"7",8,null,"10"],{SAMPLE_ROW}]"#
        );
        assert_eq!(parse_series("BTCUSDT", &body).unwrap().len(), 1);
    }

    #[test]
    fn non_array_body_is_malformed() {
        assert!(matches!(
            parse_series("BTCUSDT", r#"{"code":-1121,"msg":"Invalid symbol."}"#),
            Err(UpstreamError::Malformed { .. })
        ));
        assert!(matches!(
            parse_series("BTCUSDT", "[[1,"),
            Err(UpstreamError::Malformed { .. })
        ));
    }

    #[tokio::test]
    async fn fetch_failure_yields_empty_and_store_untouched() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/klines")
            .match_query(mockito::Matcher::Any)
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let client = BinanceClient::new(server.url(), Duration::from_secs(5)).unwrap();
        let fetcher = SeriesFetcher::new(client, None);
        let store = AggregationStore::new();

        assert_eq!(fetcher.collect_into("BTCUSDT", &store).await, 0);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn collect_into_appends_valid_rows() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/klines")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("symbol".into(), "BTCUSDT".into()),
                mockito::Matcher::UrlEncoded("interval".into(), "1m".into()),
            ]))
            .with_status(200)
            .with_body(format!("[{SAMPLE_ROW},[1,2],{SAMPLE_ROW}]"))
            .create_async()
            .await;

        let client = BinanceClient::new(server.url(), Duration::from_secs(5)).unwrap();
        let fetcher = SeriesFetcher::new(client, None);
        let store = AggregationStore::new();

        assert_eq!(fetcher.collect_into("BTCUSDT", &store).await, 2);
        assert_eq!(store.len(), 2);
    }
}
