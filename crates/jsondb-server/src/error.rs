//! Error types for the server client.

use thiserror::Error;

use crate::protocol::ErrorResponse;

/// Errors returned by `JsonDbClient` methods.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(serde_json::Error),

    #[error("server disconnected")]
    Disconnected,

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("server error: {}: {}", .0.error, .0.message)]
    Server(ErrorResponse),
}

impl ClientError {
    /// The server's error code (`"TableNotFound"`, `"RecordNotFound"`, ...),
    /// if this is a server-side error.
    pub fn code(&self) -> Option<&str> {
        match self {
            ClientError::Server(resp) => Some(&resp.error),
            _ => None,
        }
    }
}
