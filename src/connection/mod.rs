//! Connection management for the biosignal link
//!
//! This module handles:
//! - The connection lifecycle (connect, disconnect, transport events)
//! - Automatic reconnection with exponential backoff
//! - Heartbeat-based staleness detection
//! - Fan-out of samples, status changes and diagnostics

mod manager;
pub mod reconnect;

pub use manager::{ConnectionManager, LinkEvent};
pub use reconnect::{ReconnectPolicy, RetryDecision, ScheduledRetry};
