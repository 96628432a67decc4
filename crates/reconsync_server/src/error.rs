//! Error types for the sync server.

use reconsync_core::{SchemaError, StoreError};
use reconsync_protocol::ProtocolError;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the sync server.
///
/// Per-item reconciliation failures are not server errors: they are
/// reported inside the upload response. These variants cover requests the
/// server refuses as a whole.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Invalid request format or a request over a configured limit.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The request body could not be decoded, or the response encoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Store failure outside of item processing.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The type registry could not be built.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        matches!(self, ServerError::InvalidRequest(_) | ServerError::Protocol(_))
    }

    /// Returns true if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            ServerError::Store(_)
                | ServerError::Schema(_)
                | ServerError::Internal(_)
                | ServerError::Io(_)
        )
    }
}
