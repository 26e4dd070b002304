//! Error types for the prompt gateway.
//!
//! Every fallible operation in the library returns [`Result<T>`]. A
//! cancelled request is reported as [`GatewayError::Cancelled`], which callers
//! should treat as a deliberate stop rather than a fault.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// All errors surfaced by the gateway and its supporting stores.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The caller signalled the cancellation token before the call settled.
    #[error("request cancelled")]
    Cancelled,

    /// Network, credential or malformed-response failure from the backend.
    #[error("backend failure: {0}")]
    BackendFailure(String),

    #[error("configuration error: {0}")]
    Config(String),

    /// Identity registration or verification failure.
    #[error("identity error: {0}")]
    Identity(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GatewayError {
    /// `true` when the error represents a caller-requested stop.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
