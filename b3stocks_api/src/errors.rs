//! Error types for the market-data client.

/// Errors that can occur when talking to the market-data provider.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// An HTTP request failed (network error, timeout, or unreadable body).
    #[error("Request failed")]
    RequestFailed,
    /// The provider returned a non-success status with a body snippet.
    #[error("Request failed with status {status}")]
    HttpStatus { status: u16, body: String },
    /// The provider does not know the requested symbol.
    #[error("Symbol not found: {0}")]
    NotFound(String),
    /// The provider answered with an error object in the response envelope.
    #[error("Upstream error {code}: {description}")]
    Upstream { code: String, description: String },
    /// The response body could not be decoded into the expected shape.
    #[error("Failed to parse response: {0}")]
    Parse(String),
}
