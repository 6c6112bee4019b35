//! Connection manager with a persistent link, heartbeat monitoring and
//! automatic reconnection
//!
//! A single driver task owns the transport, the state machine, the heartbeat
//! monitor and the reconnect policy. Everything that can happen to the link
//! (caller requests, transport open/read results, heartbeat ticks, retry
//! timers) is one branch of its `select!` loop, so events are handled one at
//! a time and in arrival order.

use bytes::Bytes;
use futures::future::BoxFuture;
use pulse_shared::{
    codec,
    state_machine::{LinkStateMachine, LinkTrigger, TransitionResult},
    ConnectionState, ControlCommand, SignalSample,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};

use super::reconnect::{ReconnectPolicy, RetryDecision};
use crate::config::{LinkConfig, StalePolicy};
use crate::error::{LinkError, TransportError};
use crate::heartbeat::HeartbeatMonitor;
use crate::subscribers::{Subscribers, Subscription};
use crate::transport::{TransportConnector, TransportLink};

/// Diagnostics published by the connection manager
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    /// Connection state changed
    StateChanged {
        from: ConnectionState,
        to: ConnectionState,
    },
    /// Transport could not be opened
    OpenFailed { reason: String },
    /// Open transport reported an error
    TransportFailed { reason: String },
    /// Transport closed
    Closed { reason: String },
    /// Inbound frame could not be decoded; the link is unaffected
    DecodeFailed { reason: String },
    /// No inbound frame for longer than the stale threshold
    Stale { elapsed: Duration },
    /// Automatic reconnect armed
    ReconnectScheduled { attempt: u32, delay: Duration },
    /// Automatic reconnect budget spent
    ReconnectExhausted { attempts: u32 },
    /// Command dropped because the link was not connected
    CommandRejected { state: ConnectionState },
}

enum LinkInput {
    Connect,
    Disconnect,
    Send(ControlCommand),
}

/// Handle to a link managed by a background task
///
/// Cloning is cheap; all clones drive the same link. The task stops once
/// every handle has been dropped.
#[derive(Clone)]
pub struct ConnectionManager {
    input_tx: mpsc::UnboundedSender<LinkInput>,
    state_rx: watch::Receiver<ConnectionState>,
    subscribers: Arc<Subscribers>,
}

impl ConnectionManager {
    /// Create a new connection manager and start its driver task
    ///
    /// Must be called from within a Tokio runtime. The link stays `Idle`
    /// until [`connect`](Self::connect) is called.
    pub fn new<C: TransportConnector>(config: LinkConfig, connector: C) -> Self {
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Idle);
        let subscribers = Arc::new(Subscribers::default());

        let driver = LinkDriver {
            reconnect: ReconnectPolicy::from_config(&config),
            heartbeat: HeartbeatMonitor::from_config(&config),
            config,
            connector: Arc::new(connector),
            machine: LinkStateMachine::new(),
            transport: None,
            subscribers: subscribers.clone(),
            state_tx,
        };
        tokio::spawn(driver.run(input_rx));

        Self {
            input_tx,
            state_rx,
            subscribers,
        }
    }

    /// Open the link (no-op while connecting or connected)
    ///
    /// A manual connect restores the full automatic reconnect budget.
    pub fn connect(&self) -> Result<(), LinkError> {
        self.input(LinkInput::Connect)
    }

    /// Close the link and stop all automatic reconnection
    pub fn disconnect(&self) -> Result<(), LinkError> {
        self.input(LinkInput::Disconnect)
    }

    /// Send a control command to the device
    ///
    /// Returns [`LinkError::CommandRejected`] when the link is not
    /// connected; a rejected command is never queued. A command accepted here
    /// may still be dropped by the driver if the link goes down before it is
    /// sent, which surfaces only as a [`LinkEvent::CommandRejected`]
    /// diagnostic.
    pub fn send_command(&self, command: ControlCommand) -> Result<(), LinkError> {
        let state = self.state();
        if state != ConnectionState::Connected {
            warn!("Cannot send {:?}: link is {}", command.command, state);
            self.subscribers
                .events
                .dispatch(&LinkEvent::CommandRejected { state });
            return Err(LinkError::CommandRejected(state));
        }

        self.input(LinkInput::Send(command))
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Receiver that observes every state change
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Register a callback for decoded samples
    pub fn on_signal<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&SignalSample) + Send + Sync + 'static,
    {
        self.subscribers.signals.subscribe(callback)
    }

    /// Register a callback for connection state changes
    pub fn on_status_change<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&ConnectionState) + Send + Sync + 'static,
    {
        self.subscribers.status.subscribe(callback)
    }

    /// Register a callback for link diagnostics
    pub fn on_event<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&LinkEvent) + Send + Sync + 'static,
    {
        self.subscribers.events.subscribe(callback)
    }

    fn input(&self, input: LinkInput) -> Result<(), LinkError> {
        self.input_tx.send(input).map_err(|_| LinkError::Shutdown)
    }
}

enum Transport<L> {
    Opening(BoxFuture<'static, Result<L, TransportError>>),
    Open(L),
}

enum TransportEvent<L> {
    Opened(L),
    OpenFailed(TransportError),
    Frame(Bytes),
    Failed(TransportError),
    Closed,
}

/// Wait for whatever the transport does next; pending while there is none
async fn next_transport_event<L: TransportLink>(
    transport: &mut Option<Transport<L>>,
) -> TransportEvent<L> {
    match transport {
        Some(Transport::Opening(open)) => match open.await {
            Ok(link) => TransportEvent::Opened(link),
            Err(e) => TransportEvent::OpenFailed(e),
        },
        Some(Transport::Open(link)) => match link.recv().await {
            Some(Ok(frame)) => TransportEvent::Frame(frame),
            Some(Err(e)) => TransportEvent::Failed(e),
            None => TransportEvent::Closed,
        },
        None => std::future::pending().await,
    }
}

async fn close_link<L: TransportLink>(link: &mut L, limit: Duration) {
    match timeout(limit, link.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!("Error while closing link: {}", e),
        Err(_) => debug!("Timed out closing link after {:?}", limit),
    }
}

/// Owner of all link state; runs as a single task
struct LinkDriver<C: TransportConnector> {
    config: LinkConfig,
    connector: Arc<C>,
    machine: LinkStateMachine,
    /// Present exactly while Connecting or Connected
    transport: Option<Transport<C::Link>>,
    reconnect: ReconnectPolicy,
    heartbeat: HeartbeatMonitor,
    subscribers: Arc<Subscribers>,
    state_tx: watch::Sender<ConnectionState>,
}

impl<C: TransportConnector> LinkDriver<C> {
    async fn run(mut self, mut inputs: mpsc::UnboundedReceiver<LinkInput>) {
        info!(
            "Link manager started: {} transport, endpoint {}",
            self.connector.name(),
            self.config.endpoint
        );

        loop {
            tokio::select! {
                biased;

                input = inputs.recv() => match input {
                    Some(input) => self.handle_input(input).await,
                    None => break,
                },

                event = next_transport_event(&mut self.transport) => {
                    self.handle_transport_event(event);
                }

                stale = self.heartbeat.tick() => {
                    if let Some(elapsed) = stale {
                        self.handle_stale(elapsed).await;
                    }
                }

                () = self.reconnect.due() => {
                    debug!("Reconnect timer fired");
                    self.connect(false);
                }
            }
        }

        self.disconnect().await;
        info!("Link manager stopped");
    }

    async fn handle_input(&mut self, input: LinkInput) {
        match input {
            LinkInput::Connect => self.connect(true),
            LinkInput::Disconnect => self.disconnect().await,
            LinkInput::Send(command) => self.send_command(command).await,
        }
    }

    /// Start opening the transport unless one is already active
    fn connect(&mut self, manual: bool) {
        let state = self.machine.state();
        if state.has_transport() {
            debug!("Connect ignored: link is {}", state);
            return;
        }
        if manual {
            self.reconnect.reset();
        }

        let connector = Arc::clone(&self.connector);
        let limit = self.config.connect_timeout;
        info!("Connecting to {} via {}", self.config.endpoint, connector.name());

        self.transport = Some(Transport::Opening(Box::pin(async move {
            match timeout(limit, connector.connect()).await {
                Ok(result) => result,
                Err(_) => Err(TransportError::Timeout(limit)),
            }
        })));
        self.transition(LinkTrigger::ConnectRequested);
    }

    async fn disconnect(&mut self) {
        self.reconnect.reset();
        self.heartbeat.stop();

        if let Some(Transport::Open(mut link)) = self.transport.take() {
            close_link(&mut link, self.config.connect_timeout).await;
        }
        self.transition(LinkTrigger::DisconnectRequested);
    }

    async fn send_command(&mut self, command: ControlCommand) {
        let state = self.machine.state();
        let text = match codec::encode_command(&command) {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to encode {:?}: {}", command.command, e);
                return;
            }
        };

        let sent = match self.transport.as_mut() {
            Some(Transport::Open(link)) if state == ConnectionState::Connected => {
                Some(link.send_text(text).await)
            }
            _ => None,
        };

        match sent {
            Some(Ok(())) => debug!("Sent {:?}", command.command),
            Some(Err(e)) => self.fail(e),
            None => {
                warn!("Cannot send {:?}: link is {}", command.command, state);
                self.publish(LinkEvent::CommandRejected { state });
            }
        }
    }

    fn handle_transport_event(&mut self, event: TransportEvent<C::Link>) {
        match event {
            TransportEvent::Opened(link) => {
                self.transport = Some(Transport::Open(link));
                self.reconnect.reset();
                self.transition(LinkTrigger::Opened);
                self.heartbeat.start();
            }
            TransportEvent::OpenFailed(err) => {
                warn!("Failed to open link: {}", err);
                self.transport = None;
                self.publish(LinkEvent::OpenFailed {
                    reason: err.to_string(),
                });
                self.transition(LinkTrigger::OpenFailed);

                // A refused or timed-out attempt closes like any other link
                if !err.is_fatal() {
                    self.closed(err.to_string());
                }
            }
            TransportEvent::Frame(frame) => self.handle_frame(&frame),
            TransportEvent::Failed(err) => self.fail(err),
            TransportEvent::Closed => {
                self.transport = None;
                self.heartbeat.stop();
                self.closed("closed by peer".into());
            }
        }
    }

    fn handle_frame(&mut self, frame: &[u8]) {
        self.heartbeat.record_frame(Instant::now());

        match codec::decode_frame(frame) {
            Ok(samples) => {
                debug!("Frame decoded into {} sample(s)", samples.len());
                for sample in &samples {
                    self.subscribers.signals.dispatch(sample);
                }
            }
            Err(e) => {
                warn!("Dropping malformed frame: {}", e);
                self.publish(LinkEvent::DecodeFailed {
                    reason: e.to_string(),
                });
            }
        }
    }

    /// Runtime transport failure; the broken link is dropped and then
    /// treated as closed
    fn fail(&mut self, err: TransportError) {
        warn!("Link error: {}", err);
        self.transport = None;
        self.heartbeat.stop();
        self.publish(LinkEvent::TransportFailed {
            reason: err.to_string(),
        });
        self.transition(LinkTrigger::TransportFailed);
        self.closed(err.to_string());
    }

    fn closed(&mut self, reason: String) {
        info!("Link closed: {}", reason);
        self.publish(LinkEvent::Closed { reason });
        self.transition(LinkTrigger::TransportClosed);
        self.schedule_retry();
    }

    fn schedule_retry(&mut self) {
        match self.reconnect.schedule() {
            RetryDecision::Scheduled(retry) => {
                info!(
                    "Reconnecting in {:?} (attempt {})",
                    retry.delay, retry.attempt
                );
                self.publish(LinkEvent::ReconnectScheduled {
                    attempt: retry.attempt,
                    delay: retry.delay,
                });
            }
            RetryDecision::AlreadyPending => debug!("Reconnect already pending"),
            RetryDecision::Exhausted { attempts } => {
                warn!("Max reconnection attempts reached ({})", attempts);
                self.publish(LinkEvent::ReconnectExhausted { attempts });
            }
        }
    }

    async fn handle_stale(&mut self, elapsed: Duration) {
        warn!("No frame for {:?}, link may be stale", elapsed);
        self.publish(LinkEvent::Stale { elapsed });

        if self.config.stale_policy == StalePolicy::Reconnect {
            self.heartbeat.stop();
            if let Some(Transport::Open(mut link)) = self.transport.take() {
                close_link(&mut link, self.config.connect_timeout).await;
            }
            self.closed(format!("stale for {:?}", elapsed));
        }
    }

    fn transition(&mut self, trigger: LinkTrigger) {
        match self.machine.process(trigger) {
            TransitionResult::Success { from, to } => {
                info!("Link state: {} -> {}", from, to);
                self.state_tx.send_replace(to);
                self.subscribers.status.dispatch(&to);
                self.publish(LinkEvent::StateChanged { from, to });
            }
            TransitionResult::Unchanged(state) => {
                debug!("{:?} leaves link {}", trigger, state);
            }
            TransitionResult::Invalid { from, trigger } => {
                warn!("Ignoring {:?} while {}", trigger, from);
            }
        }
    }

    fn publish(&self, event: LinkEvent) {
        self.subscribers.events.dispatch(&event);
    }
}
