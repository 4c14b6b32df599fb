//! Error types for the portfolio worker
//!
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Custom Result type using our Error
pub type Result<T> = std::result::Result<T, PortfolioError>;

/// Portfolio worker errors
#[derive(Error, Debug)]
pub enum PortfolioError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Missing or malformed API credentials
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Binance answered with a non-success status
    #[error("Binance API error: {0}")]
    BinanceApi(String),

    /// HTTP request errors (transport or unexpected status)
    #[error("HTTP error: {0}")]
    Http(String),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Rate limit exceeded
    #[error("Rate limit exceeded: retry after {0} seconds")]
    RateLimit(u64),

    /// Read endpoints hit before the first synchronization
    #[error("Portfolio not synchronized yet")]
    NotSynced,

    /// Worker runtime errors
    #[error("Worker error: {0}")]
    Worker(String),

    /// Storage errors
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<worker::Error> for PortfolioError {
    fn from(err: worker::Error) -> Self {
        PortfolioError::Worker(err.to_string())
    }
}

impl From<reqwest::Error> for PortfolioError {
    fn from(err: reqwest::Error) -> Self {
        PortfolioError::Http(err.to_string())
    }
}

impl From<PortfolioError> for worker::Error {
    fn from(err: PortfolioError) -> Self {
        worker::Error::RustError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PortfolioError::RateLimit(3);
        assert_eq!(err.to_string(), "Rate limit exceeded: retry after 3 seconds");
    }

    #[test]
    fn test_error_conversion() {
        let json_err = serde_json::from_str::<i32>("invalid").unwrap_err();
        let err: PortfolioError = json_err.into();
        assert!(matches!(err, PortfolioError::Json(_)));
    }

    #[test]
    fn test_into_worker_error() {
        let err: worker::Error = PortfolioError::NotSynced.into();
        assert!(err.to_string().contains("not synchronized"));
    }
}
