//! TCP transport carrying newline-delimited JSON frames

use async_trait::async_trait;
use bytes::Bytes;
use pulse_shared::framing::{encode_line, LineDecoder};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::TransportError;
use crate::transport::traits::{TransportConnector, TransportLink};

/// TCP stream wrapper implementing TransportLink
pub struct TcpLink {
    inner: TcpStream,
    decoder: LineDecoder,
    read_buf: Vec<u8>,
}

impl TcpLink {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            inner: stream,
            decoder: LineDecoder::new(),
            read_buf: vec![0u8; 4096],
        }
    }
}

#[async_trait]
impl TransportLink for TcpLink {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        let frame = encode_line(&text)?;
        self.inner.write_all(&frame).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<Bytes, TransportError>> {
        loop {
            // Drain complete frames before reading more
            match self.decoder.decode_next() {
                Ok(Some(line)) => return Some(Ok(line)),
                Ok(None) => {}
                Err(e) => return Some(Err(e.into())),
            }

            match self.inner.read(&mut self.read_buf).await {
                Ok(0) => return None,
                Ok(n) => self.decoder.extend(&self.read_buf[..n]),
                Err(e) => return Some(Err(e.into())),
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.inner.shutdown().await?;
        Ok(())
    }
}

/// TCP connector for a `host:port` address
pub struct TcpConnector {
    address: String,
}

impl TcpConnector {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

#[async_trait]
impl TransportConnector for TcpConnector {
    type Link = TcpLink;

    async fn connect(&self) -> Result<Self::Link, TransportError> {
        let stream = TcpStream::connect(&self.address).await?;
        stream.set_nodelay(true)?;
        Ok(TcpLink::new(stream))
    }

    fn name(&self) -> &'static str {
        "TCP"
    }
}
