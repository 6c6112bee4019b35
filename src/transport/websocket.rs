//! WebSocket transport, the device's native link

use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

use crate::error::TransportError;
use crate::transport::traits::{TransportConnector, TransportLink};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket link wrapper implementing TransportLink
pub struct WebSocketLink {
    inner: WsStream,
}

impl WebSocketLink {
    pub fn new(stream: WsStream) -> Self {
        Self { inner: stream }
    }
}

#[async_trait]
impl TransportLink for WebSocketLink {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.inner.send(Message::text(text)).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<Bytes, TransportError>> {
        loop {
            match self.inner.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(Bytes::from(text))),
                Ok(Message::Binary(data)) => return Some(Ok(data)),
                Ok(Message::Close(frame)) => {
                    debug!("Close frame received: {:?}", frame);
                    return None;
                }
                // Pongs are sent by tungstenite itself
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {}
                Err(e) => return Some(Err(e.into())),
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.inner.close(None).await?;
        Ok(())
    }
}

/// WebSocket connector for a `ws://` URL
pub struct WebSocketConnector {
    url: String,
}

impl WebSocketConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl TransportConnector for WebSocketConnector {
    type Link = WebSocketLink;

    async fn connect(&self) -> Result<Self::Link, TransportError> {
        let (stream, _response) = connect_async(self.url.as_str()).await?;
        Ok(WebSocketLink::new(stream))
    }

    fn name(&self) -> &'static str {
        "WebSocket"
    }
}
