//! Error types for the link client

use pulse_shared::{codec::CodecError, ConnectionState};
use std::time::Duration;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Failures reported by a transport while opening or running
#[derive(Error, Debug)]
pub enum TransportError {
    /// The endpoint can never be opened (bad URL, unsupported scheme)
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Connect timed out after {0:?}")]
    Timeout(Duration),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(Box<tungstenite::Error>),

    #[error("Framing error: {0}")]
    Framing(#[from] CodecError),
}

impl TransportError {
    /// Whether retrying the same endpoint can never succeed
    pub fn is_fatal(&self) -> bool {
        matches!(self, TransportError::InvalidEndpoint(_))
    }
}

impl From<tungstenite::Error> for TransportError {
    fn from(err: tungstenite::Error) -> Self {
        match err {
            tungstenite::Error::Url(e) => TransportError::InvalidEndpoint(e.to_string()),
            tungstenite::Error::HttpFormat(e) => TransportError::InvalidEndpoint(e.to_string()),
            other => TransportError::WebSocket(Box::new(other)),
        }
    }
}

/// Errors returned to callers of the link handle
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// Command not sent because the link is not connected
    #[error("Command rejected: link is {0}")]
    CommandRejected(ConnectionState),

    /// The link task has stopped
    #[error("Link task has shut down")]
    Shutdown,
}
