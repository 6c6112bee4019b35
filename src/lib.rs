//! Client-side link to a wearable biosignal acquisition device
//!
//! [`ConnectionManager`] keeps one persistent link to the device, decodes
//! inbound frames into [`SignalSample`]s and fans them out to subscribers,
//! reconnects with exponential backoff and flags links that have gone quiet.

pub mod config;
pub mod connection;
pub mod error;
pub mod heartbeat;
pub mod subscribers;
pub mod transport;

pub use config::{LinkConfig, StalePolicy};
pub use connection::{ConnectionManager, LinkEvent};
pub use error::{LinkError, TransportError};
pub use pulse_shared::{
    CommandKind, ConnectionState, ControlCommand, Envelope, SignalKind, SignalPayload,
    SignalSample,
};
pub use subscribers::Subscription;
