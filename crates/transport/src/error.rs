//! Transport error types

use thiserror::Error;

/// Transport errors
///
/// Everything except `Bind` is transient: the client reconnects, the ingress
/// drops the session.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The ingress listener could not be bound
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Socket error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Frame body could not be encoded or decoded
    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),

    /// Peer closed the connection
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// Operation requires an open connection
    #[error("not connected")]
    NotConnected,

    /// Server refused to open the stream
    #[error("stream rejected: {reason}")]
    Rejected { reason: String },

    /// Peer sent a message that is not valid at this point
    #[error("unexpected message: expected {expected}, got {got}")]
    UnexpectedMessage { expected: &'static str, got: String },

    /// Peer did not answer in time
    #[error("timed out waiting for {operation}")]
    Timeout { operation: &'static str },
}

impl TransportError {
    pub fn unexpected(expected: &'static str, got: impl std::fmt::Debug) -> Self {
        Self::UnexpectedMessage {
            expected,
            got: format!("{got:?}"),
        }
    }
}

/// Transport Result type alias
pub type Result<T> = std::result::Result<T, TransportError>;
