//! Error types for the Dify client.

use thiserror::Error;

/// Result type for Dify client operations.
pub type Result<T> = std::result::Result<T, DifyError>;

/// Dify client errors.
#[derive(Debug, Error)]
pub enum DifyError {
    /// Missing API key or invalid settings
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection failed or timed out
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response or an `error` event in the stream
    #[error("API error: {0}")]
    Api(String),

    /// Undecodable stream content
    #[error("Parse error: {0}")]
    Parse(String),
}
