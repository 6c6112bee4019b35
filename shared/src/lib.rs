//! Pulse Shared Protocol Types
//!
//! This crate provides the wire types, codec and connection state machine
//! shared by the pulse link client and anything that consumes its events.

pub mod codec;
pub mod framing;
pub mod protocol;
pub mod state_machine;

// Re-export commonly used types at crate root
pub use protocol::*;
pub use state_machine::ConnectionState;

/// Default link parameters
pub mod link {
    /// Heartbeat check interval in milliseconds
    pub const HEARTBEAT_INTERVAL_MS: u64 = 2000;

    /// No inbound frame for longer than this marks the link stale
    pub const STALE_THRESHOLD_MS: u64 = 5000;

    /// Base delay for the first automatic reconnect
    pub const RECONNECT_BASE_DELAY_MS: u64 = 1000;

    /// Upper bound for a single reconnect delay
    pub const MAX_RECONNECT_DELAY_MS: u64 = 30_000;

    /// Automatic reconnect attempts before giving up
    pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;

    /// Transport open timeout
    pub const CONNECT_TIMEOUT_MS: u64 = 5000;
}
