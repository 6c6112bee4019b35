//! Heartbeat Module
//!
//! Detects links that are nominally open but have stopped delivering
//! frames.

mod monitor;

pub use monitor::HeartbeatMonitor;
