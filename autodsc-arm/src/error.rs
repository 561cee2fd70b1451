//! Client error types.

use thiserror::Error;

/// Errors returned by a node configuration client.
#[derive(Debug, Error)]
pub enum ArmError {
    /// The service answered 404 for the addressed resource.
    #[error("not found: {0}")]
    NotFound(String),

    /// Any other non-success answer from the service.
    #[error("request failed with status {status}: {code}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// Connection, TLS or timeout failure.
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),

    /// A success response whose body could not be decoded.
    #[error("decode: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// The caller's cancellation token fired before the call completed.
    #[error("operation cancelled")]
    Cancelled,
}

impl ArmError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ArmError::NotFound(_))
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ArmError>;
