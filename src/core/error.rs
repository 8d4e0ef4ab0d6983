//! Error types for quote retrieval

use thiserror::Error;

/// Why a single symbol could not be fetched.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Network failure or timeout before a response arrived.
    #[error("Request error for symbol {symbol}: {message}")]
    Transport { symbol: String, message: String },

    #[error("HTTP error: {status} for symbol: {symbol}")]
    Status { symbol: String, status: u16 },

    /// A 2xx response that does not carry a usable chart result.
    #[error("Malformed response for symbol {symbol}: {reason}")]
    Malformed { symbol: String, reason: String },

    #[error("No provider credentials configured")]
    NoCredentials,

    /// Every credential was tried `retry_budget_multiplier` times.
    #[error("Gave up on {symbol} after {attempts} attempts: {last}")]
    QuotaExhausted {
        symbol: String,
        attempts: usize,
        last: Box<FetchError>,
    },
}

impl FetchError {
    /// Transport, status and malformed-payload failures rotate to the next credential.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::Transport { .. } | FetchError::Status { .. } | FetchError::Malformed { .. }
        )
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("Invalid range: {0}")]
    UnknownRange(String),

    #[error("Invalid interval: {0}")]
    UnknownInterval(String),

    #[error("Interval {interval} is not available for range {range}")]
    Unsupported { range: String, interval: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_taxonomy() {
        let transport = FetchError::Transport {
            symbol: "AAPL".to_string(),
            message: "timed out".to_string(),
        };
        let status = FetchError::Status {
            symbol: "AAPL".to_string(),
            status: 429,
        };
        let malformed = FetchError::Malformed {
            symbol: "AAPL".to_string(),
            reason: "missing chart.result".to_string(),
        };
        assert!(transport.is_retryable());
        assert!(status.is_retryable());
        assert!(malformed.is_retryable());
        assert!(!FetchError::NoCredentials.is_retryable());

        let exhausted = FetchError::QuotaExhausted {
            symbol: "AAPL".to_string(),
            attempts: 2,
            last: Box::new(status.clone()),
        };
        assert!(!exhausted.is_retryable());
        assert_eq!(
            exhausted.to_string(),
            "Gave up on AAPL after 2 attempts: HTTP error: 429 for symbol: AAPL"
        );
    }
}
