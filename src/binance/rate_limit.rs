// =============================================================================
// Used-Weight Tracker — observes Binance request weight
// =============================================================================
//
// Binance allows 1200 request weight per minute per IP. One `/ohlcv` request
// costs the ticker snapshot (80) plus 2 per kline call, so a burst of calls
// from several dashboards can get close to the cap.
//
// The tracker reads `X-MBX-USED-WEIGHT-1M` after every response and keeps it
// in an atomic any task may query lock-free. It only observes: requests are
// never delayed or refused based on it.
// =============================================================================

use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{debug, warn};

const USED_WEIGHT_HEADER: &str = "X-MBX-USED-WEIGHT-1M";

/// Binance's per-minute weight cap.
pub const WEIGHT_LIMIT_1M: u32 = 1200;
/// Warning threshold.
const WEIGHT_WARN_THRESHOLD: u32 = 1000;

pub struct UsedWeightTracker {
    used_weight_1m: AtomicU32,
}

impl UsedWeightTracker {
    pub fn new() -> Self {
        Self {
            used_weight_1m: AtomicU32::new(0),
        }
    }

    /// Update from the response headers of any provider call.
    pub fn update_from_headers(&self, headers: &reqwest::header::HeaderMap) {
        let Some(w) = headers
            .get(USED_WEIGHT_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u32>().ok())
        else {
            return;
        };

        let prev = self.used_weight_1m.swap(w, Ordering::Relaxed);
        if w >= WEIGHT_WARN_THRESHOLD && prev < WEIGHT_WARN_THRESHOLD {
            warn!(
                used_weight = w,
                limit = WEIGHT_LIMIT_1M,
                "upstream request weight crossed warning threshold"
            );
        }
        debug!(used_weight_1m = w, "request weight updated from header");
    }

    /// Last observed weight, 0 until a response carried the header.
    pub fn used_weight_1m(&self) -> u32 {
        self.used_weight_1m.load(Ordering::Relaxed)
    }
}

impl Default for UsedWeightTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for UsedWeightTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsedWeightTracker")
            .field("used_weight_1m", &self.used_weight_1m())
            .finish()
    }
}
