//! Scripted in-memory transport for driving the link in tests

use async_trait::async_trait;
use bytes::Bytes;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::TransportError;
use crate::transport::traits::{TransportConnector, TransportLink};

enum Inbound {
    Frame(Bytes),
    Fail(String),
    Close,
}

/// Test-side end of one accepted connection
pub struct MockPeer {
    inbound: mpsc::UnboundedSender<Inbound>,
    sent: mpsc::UnboundedReceiver<String>,
}

impl MockPeer {
    /// Deliver a text frame to the link
    pub fn frame(&self, text: impl Into<String>) {
        self.raw(text.into().into_bytes());
    }

    /// Deliver an arbitrary payload to the link
    pub fn raw(&self, payload: impl Into<Bytes>) {
        let _ = self.inbound.send(Inbound::Frame(payload.into()));
    }

    /// Make the link report a runtime error
    pub fn fail(&self, reason: impl Into<String>) {
        let _ = self.inbound.send(Inbound::Fail(reason.into()));
    }

    /// Close the link from the remote side
    pub fn close(&self) {
        let _ = self.inbound.send(Inbound::Close);
    }

    /// Next frame sent by the link, if any is queued
    pub fn try_sent(&mut self) -> Option<String> {
        self.sent.try_recv().ok()
    }

    pub async fn next_sent(&mut self) -> Option<String> {
        self.sent.recv().await
    }
}

pub struct MockLink {
    inbound: mpsc::UnboundedReceiver<Inbound>,
    sent: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl TransportLink for MockLink {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.sent
            .send(text)
            .map_err(|_| io::Error::from(io::ErrorKind::BrokenPipe).into())
    }

    async fn recv(&mut self) -> Option<Result<Bytes, TransportError>> {
        match self.inbound.recv().await? {
            Inbound::Frame(payload) => Some(Ok(payload)),
            Inbound::Fail(reason) => Some(Err(io::Error::other(reason).into())),
            Inbound::Close => None,
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.inbound.close();
        Ok(())
    }
}

/// Shared switches for a [`MockConnector`]
#[derive(Clone, Default)]
pub struct MockControl {
    refuse: Arc<AtomicBool>,
    invalid: Arc<AtomicBool>,
    attempts: Arc<AtomicUsize>,
}

impl MockControl {
    /// Refuse (retryably) every connect from now on
    pub fn refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    /// Fail every connect with a fatal endpoint error
    pub fn invalid_endpoint(&self, invalid: bool) {
        self.invalid.store(invalid, Ordering::SeqCst);
    }

    /// Connect calls made so far
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

pub struct MockConnector {
    control: MockControl,
    peers: mpsc::UnboundedSender<MockPeer>,
}

impl MockConnector {
    /// Connector plus its control switches and a feed of accepted peers
    pub fn new() -> (Self, MockControl, mpsc::UnboundedReceiver<MockPeer>) {
        let control = MockControl::default();
        let (peers, peers_rx) = mpsc::unbounded_channel();
        (
            Self {
                control: control.clone(),
                peers,
            },
            control,
            peers_rx,
        )
    }
}

#[async_trait]
impl TransportConnector for MockConnector {
    type Link = MockLink;

    async fn connect(&self) -> Result<Self::Link, TransportError> {
        self.control.attempts.fetch_add(1, Ordering::SeqCst);

        if self.control.invalid.load(Ordering::SeqCst) {
            return Err(TransportError::InvalidEndpoint("mock://invalid".into()));
        }
        if self.control.refuse.load(Ordering::SeqCst) {
            return Err(io::Error::from(io::ErrorKind::ConnectionRefused).into());
        }

        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        let _ = self.peers.send(MockPeer {
            inbound: inbound_tx,
            sent: sent_rx,
        });

        Ok(MockLink {
            inbound: inbound_rx,
            sent: sent_tx,
        })
    }

    fn name(&self) -> &'static str {
        "Mock"
    }
}
