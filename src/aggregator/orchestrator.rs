// =============================================================================
// Request Orchestrator — one /ohlcv request from ticker snapshot to response
// =============================================================================
//
//   Idle → FetchingTicker → Ranking → FetchingSeries → Aggregating
//        → Responding → Done            (any failure before ranking → Failed)
//
// One tokio task per ranked symbol, all writing into a store owned by this
// request alone. The store is read only after every task has been joined.
// If the request deadline passes while series are still in flight, the
// outstanding tasks are aborted (and joined) and the request answers with what
// it has.
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::aggregator::ranker;
use crate::aggregator::series::SeriesFetcher;
use crate::aggregator::store::AggregationStore;
use crate::aggregator::ticker::TickerSnapshotFetcher;
use crate::binance::client::TICKER_ENDPOINT;
use crate::binance::BinanceClient;
use crate::config::ServiceConfig;
use crate::error::UpstreamError;
use crate::types::CandleRecord;

/// Number of records echoed to the debug log before responding.
const PREVIEW_RECORDS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    FetchingTicker,
    Ranking,
    FetchingSeries,
    Aggregating,
    Responding,
    Done,
    Failed,
}

impl Stage {
    /// Whether `self → next` is a legal transition.
    pub fn can_advance_to(self, next: Stage) -> bool {
        use Stage::*;
        matches!(
            (self, next),
            (Idle, FetchingTicker)
                | (FetchingTicker, Ranking)
                | (FetchingTicker, Failed)
                | (Ranking, FetchingSeries)
                | (FetchingSeries, Aggregating)
                | (Aggregating, Responding)
                | (Responding, Done)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Done | Stage::Failed)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "Idle",
            Self::FetchingTicker => "FetchingTicker",
            Self::Ranking => "Ranking",
            Self::FetchingSeries => "FetchingSeries",
            Self::Aggregating => "Aggregating",
            Self::Responding => "Responding",
            Self::Done => "Done",
            Self::Failed => "Failed",
        };
        write!(f, "{s}")
    }
}

/// Stage bookkeeping for one run.
struct RunProgress {
    stage: Stage,
    started: Instant,
}

impl RunProgress {
    fn new() -> Self {
        Self {
            stage: Stage::Idle,
            started: Instant::now(),
        }
    }

    fn advance(&mut self, next: Stage) {
        debug_assert!(
            self.stage.can_advance_to(next),
            "illegal stage transition {} -> {}",
            self.stage,
            next
        );
        debug!(
            from = %self.stage,
            to = %next,
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            "pipeline stage"
        );
        self.stage = next;
        if next.is_terminal() {
            debug!(stage = %next, elapsed_ms = self.started.elapsed().as_millis() as u64, "pipeline finished");
        }
    }
}

#[derive(Debug, Clone)]
pub struct RequestOrchestrator {
    tickers: TickerSnapshotFetcher,
    series: SeriesFetcher,
    quote_currency: String,
    top_n: usize,
    deadline: Duration,
}

impl RequestOrchestrator {
    pub fn new(client: BinanceClient, config: &ServiceConfig) -> Self {
        Self {
            tickers: TickerSnapshotFetcher::new(client.clone()),
            series: SeriesFetcher::new(client, config.kline_limit),
            quote_currency: config.quote_currency.clone(),
            top_n: config.top_n,
            deadline: config.request_deadline(),
        }
    }

    /// Run the whole pipeline. Only the ticker stage can fail the request.
    #[instrument(skip(self), name = "ohlcv::run", fields(quote = %self.quote_currency, top_n = self.top_n))]
    pub async fn run(&self) -> Result<Vec<CandleRecord>, UpstreamError> {
        let mut progress = RunProgress::new();
        let deadline = progress.started + self.deadline;

        // ── Ticker snapshot ─────────────────────────────────────────────
        progress.advance(Stage::FetchingTicker);
        let tickers =
            match tokio::time::timeout_at(deadline, self.tickers.fetch(&self.quote_currency)).await
            {
                Ok(Ok(t)) => t,
                Ok(Err(e)) => {
                    progress.advance(Stage::Failed);
                    return Err(e);
                }
                Err(_) => {
                    progress.advance(Stage::Failed);
                    warn!(deadline_ms = self.deadline.as_millis() as u64, "request deadline hit during ticker snapshot");
                    return Err(UpstreamError::Timeout {
                        endpoint: TICKER_ENDPOINT,
                    });
                }
            };

        // ── Ranking ─────────────────────────────────────────────────────
        progress.advance(Stage::Ranking);
        let symbols = ranker::rank(&tickers, self.top_n);
        info!(candidates = tickers.len(), selected = symbols.len(), "symbols ranked by quote volume");

        // ── Fan-out ─────────────────────────────────────────────────────
        progress.advance(Stage::FetchingSeries);
        let store = Arc::new(AggregationStore::new());
        let handles: Vec<_> = symbols
            .iter()
            .map(|symbol| {
                let fetcher = self.series.clone();
                let store = store.clone();
                let symbol = symbol.clone();
                tokio::spawn(async move { fetcher.collect_into(&symbol, &store).await })
            })
            .collect();
        let abort_handles: Vec<_> = handles.iter().map(|h| h.abort_handle()).collect();

        let mut all = Box::pin(join_all(handles));
        let results = match tokio::time::timeout_at(deadline, &mut all).await {
            Ok(results) => results,
            Err(_) => {
                warn!(
                    deadline_ms = self.deadline.as_millis() as u64,
                    "request deadline hit, aborting outstanding series fetches"
                );
                for h in &abort_handles {
                    h.abort();
                }
                all.await
            }
        };

        let mut empty = 0usize;
        let mut cancelled = 0usize;
        for (symbol, result) in symbols.iter().zip(&results) {
            match result {
                Ok(0) => empty += 1,
                Ok(_) => {}
                Err(e) if e.is_cancelled() => cancelled += 1,
                Err(e) => warn!(symbol = %symbol, error = %e, "series task panicked"),
            }
        }

        // ── Aggregate ───────────────────────────────────────────────────
        progress.advance(Stage::Aggregating);
        let records = match Arc::try_unwrap(store) {
            Ok(store) => store.into_records(),
            Err(shared) => shared.drain(),
        };

        progress.advance(Stage::Responding);
        info!(
            records = records.len(),
            symbols = symbols.len(),
            empty,
            cancelled,
            "sending aggregated klines"
        );
        for r in records.iter().take(PREVIEW_RECORDS) {
            debug!(symbol = %r.symbol, open = %r.open, close = %r.close, "record preview");
        }

        progress.advance(Stage::Done);
        Ok(records)
    }
}
