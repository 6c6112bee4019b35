//! Transport trait abstraction for pluggable network backends

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::TransportError;

/// An open, message-oriented link carrying JSON frames
#[async_trait]
pub trait TransportLink: Send + 'static {
    /// Send one text frame
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    /// Receive the next frame payload, undecoded
    ///
    /// Returns `None` once the link is closed. Must be cancel-safe: it is
    /// polled from a `select!` loop. Payload validation (UTF-8, JSON) is
    /// left to the codec so a bad frame never fails the link.
    async fn recv(&mut self) -> Option<Result<Bytes, TransportError>>;

    /// Close the link gracefully
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Factory for creating transport connections
#[async_trait]
pub trait TransportConnector: Send + Sync + 'static {
    /// The link type this connector produces
    type Link: TransportLink;

    /// Attempt to connect, returning a link on success
    async fn connect(&self) -> Result<Self::Link, TransportError>;

    /// Human-readable name for this transport
    fn name(&self) -> &'static str;
}
