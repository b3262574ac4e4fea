//! Error types for the cosim bridge client library.

use crate::wire::{FailureReason, WireError};

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur during client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Failed to establish a connection to the bridge.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Frame-level error on the wire.
    #[error("wire error: {0}")]
    Wire(#[from] WireError),

    /// The bridge reported a failure for the request.
    #[error("bridge error ({reason:?}): {message}")]
    Bridge {
        /// Failure classification from the server.
        reason: FailureReason,
        /// Server-provided detail.
        message: String,
    },

    /// The bridge closed the connection mid-exchange.
    #[error("connection closed by bridge")]
    Closed,

    /// The bridge answered with a body that does not match the request.
    #[error("unexpected response body")]
    UnexpectedResponse,
}

impl ClientError {
    /// Returns the failure reason if the bridge reported one.
    pub fn reason(&self) -> Option<FailureReason> {
        match self {
            ClientError::Bridge { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    /// Returns true if the endpoint id was never registered.
    pub fn is_unknown_endpoint(&self) -> bool {
        matches!(self.reason(), Some(FailureReason::UnknownEndpoint))
    }

    /// Returns true if the send was rejected because the inbound queue is
    /// full; such a send may be retried.
    pub fn is_queue_full(&self) -> bool {
        matches!(self.reason(), Some(FailureReason::QueueFull))
    }

    /// Returns true if the bridge is shutting down or already gone.
    pub fn is_shutdown(&self) -> bool {
        matches!(self.reason(), Some(FailureReason::ShuttingDown))
            || matches!(self, ClientError::Closed)
    }
}
