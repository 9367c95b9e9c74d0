// =============================================================================
// Error types
// =============================================================================
//
// `UpstreamError` covers everything that can go wrong talking to the market
// data provider. `RowSkip` is the per-row decision taken while parsing a kline
// series; it never leaves the series fetcher. `ApiError` is what the HTTP
// layer renders.
// =============================================================================

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Failure of a single outbound call (or of the request deadline).
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Transport failure, unreadable body or non-success status.
    #[error("{endpoint} unavailable: {reason}")]
    Unavailable {
        endpoint: &'static str,
        reason: String,
    },

    /// Per-call timeout or whole-request deadline elapsed.
    #[error("{endpoint} timed out")]
    Timeout { endpoint: &'static str },

    /// Body was not valid JSON or not the expected top-level shape.
    #[error("{endpoint} returned a malformed response: {reason}")]
    Malformed {
        endpoint: &'static str,
        reason: String,
    },
}

impl UpstreamError {
    /// Classify a reqwest error for `endpoint`.
    pub fn from_reqwest(endpoint: &'static str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout { endpoint }
        } else {
            Self::Unavailable {
                endpoint,
                reason: err.to_string(),
            }
        }
    }
}

/// Why a kline row was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowSkip {
    #[error("row is not an array")]
    NotAnArray,

    #[error("row has {len} elements, expected at least 11")]
    TooShort { len: usize },

    #[error("field {field} at index {index} has the wrong type")]
    FieldType { index: usize, field: &'static str },
}

/// Error returned by HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("ticker snapshot failed: {0}")]
    TickerSnapshot(#[source] UpstreamError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::TickerSnapshot(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch 24-hour ticker data",
            )
                .into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_endpoint() {
        let e = UpstreamError::Malformed {
            endpoint: "ticker/24hr",
            reason: "expected array".into(),
        };
        assert_eq!(
            e.to_string(),
            "ticker/24hr returned a malformed response: expected array"
        );
    }

    #[test]
    fn api_error_is_plain_500() {
        let resp = ApiError::TickerSnapshot(UpstreamError::Timeout {
            endpoint: "ticker/24hr",
        })
        .into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let ct = resp
            .headers()
            .get(axum::http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        assert!(ct.starts_with("text/plain"));
    }
}
