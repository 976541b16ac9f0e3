//! WebSocket error types.
//!
//! Provides error types for WebSocket client operations.

/// WebSocket errors.
#[derive(Debug, thiserror::Error)]
pub enum WsError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The socket ended with a read error.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Failed to serialize message.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Not connected.
    #[error("not connected")]
    NotConnected,

    /// Connection closed.
    #[error("connection closed")]
    Closed,

    /// No event arrived in time.
    #[error("timed out waiting for an event")]
    Timeout,

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for WsError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Protocol(err.to_string())
    }
}
