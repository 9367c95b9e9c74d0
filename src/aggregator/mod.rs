// =============================================================================
// OHLCV aggregation pipeline
// =============================================================================
//
// ticker snapshot → volume ranking → per-symbol kline fan-out → per-request
// store → response. The orchestrator drives the stages; the other modules
// are the stages themselves.

pub mod orchestrator;
pub mod ranker;
pub mod series;
pub mod store;
pub mod ticker;

pub use orchestrator::RequestOrchestrator;
