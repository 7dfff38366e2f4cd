//! Error types for the library layer.

use std::fmt;

use thiserror::Error;

/// Failure to obtain market data for one ticker.
///
/// Produced only at the accessor boundary. A fetch either yields a complete,
/// validated value or one of these; partial tables are never returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("Ticker not found: {0}")]
    TickerNotFound(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Upstream returned HTTP {status}")]
    Http { status: u16, body: String },
    #[error("Upstream error: {0}")]
    Upstream(String),
    #[error("Malformed upstream payload: {0}")]
    Malformed(String),
    #[error("Missing field in upstream payload: {0}")]
    MissingField(&'static str),
}

impl From<b3stocks_api::Error> for FetchError {
    fn from(e: b3stocks_api::Error) -> Self {
        match e {
            b3stocks_api::Error::NotFound(ticker) => Self::TickerNotFound(ticker),
            b3stocks_api::Error::RequestFailed => {
                Self::Network("request failed or timed out".to_string())
            }
            b3stocks_api::Error::HttpStatus { status, body } => Self::Http { status, body },
            b3stocks_api::Error::Upstream { code, description } => {
                Self::Upstream(format!("{}: {}", code, description))
            }
            b3stocks_api::Error::Parse(msg) => Self::Malformed(msg),
        }
    }
}

/// Errors produced by the library layer outside a single fetch: selections
/// the engine cannot run on, rejected user input, unusable configuration.
#[derive(Debug)]
pub enum StockDashError {
    /// An engine function was about to be called on input it does not accept
    /// (no ticker selected, fewer than two for a comparison, empty table).
    Precondition(String),
    /// User-provided input failed validation.
    InvalidInput(String),
    /// The configuration file or environment could not be used.
    Config(String),
}

impl fmt::Display for StockDashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Precondition(msg) => write!(f, "Precondition failed: {}", msg),
            Self::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            Self::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for StockDashError {}
