// =============================================================================
// Volume Ranker — top-N symbols by 24h quote volume
// =============================================================================
//
// Pure function, no I/O. Volumes are parsed to f64 for comparison only; a
// value that does not parse (or parses to NaN/inf) ranks as 0 so one bad row
// can never fail the ranking.
// =============================================================================

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::types::TickerSummary;

/// Comparison key for a quote volume string.
fn parsed_volume(raw: &str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// Return at most `limit` distinct symbols, highest quote volume first.
///
/// The sort is stable, so equal volumes keep their input order. If a symbol
/// appears more than once only its highest-ranked occurrence is kept.
pub fn rank(tickers: &[TickerSummary], limit: usize) -> Vec<String> {
    let mut keyed: Vec<(f64, &str)> = tickers
        .iter()
        .map(|t| (parsed_volume(&t.quote_volume), t.symbol.as_str()))
        .collect();

    keyed.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

    let mut seen = HashSet::with_capacity(limit.min(keyed.len()));
    keyed
        .into_iter()
        .filter(|(_, sym)| seen.insert(*sym))
        .take(limit)
        .map(|(_, sym)| sym.to_string())
        .collect()
}
