pub mod tcp;
pub mod traits;
pub mod websocket;

#[cfg(test)]
pub(crate) mod mock;

pub use tcp::{TcpConnector, TcpLink};
pub use traits::{TransportConnector, TransportLink};
pub use websocket::{WebSocketConnector, WebSocketLink};
