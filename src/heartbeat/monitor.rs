//! Heartbeat Monitor
//!
//! Owns the heartbeat clock (time of the last inbound frame) and the
//! periodic ticker that checks it. The ticker only exists while the link is
//! connected; dropping it cancels every pending tick.

use pulse_shared::link::HEARTBEAT_INTERVAL_MS;
use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::warn;

use crate::config::LinkConfig;

/// Tracks inbound traffic recency for one connection
#[derive(Debug)]
pub struct HeartbeatMonitor {
    interval: Duration,
    stale_threshold: Duration,
    /// Last inbound frame, `None` while stopped
    last_frame: Option<Instant>,
    ticker: Option<Interval>,
}

impl HeartbeatMonitor {
    /// Create a stopped monitor
    ///
    /// A zero interval falls back to the default heartbeat interval.
    pub fn new(interval: Duration, stale_threshold: Duration) -> Self {
        let interval = if interval.is_zero() {
            warn!("Heartbeat interval must be non-zero, using {}ms", HEARTBEAT_INTERVAL_MS);
            Duration::from_millis(HEARTBEAT_INTERVAL_MS)
        } else {
            interval
        };

        Self {
            interval,
            stale_threshold,
            last_frame: None,
            ticker: None,
        }
    }

    pub fn from_config(config: &LinkConfig) -> Self {
        Self::new(config.heartbeat_interval, config.stale_threshold)
    }

    /// Start monitoring; the clock starts at the current instant
    pub fn start(&mut self) {
        let now = Instant::now();
        let mut ticker = interval_at(now + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.last_frame = Some(now);
        self.ticker = Some(ticker);
    }

    /// Stop monitoring and cancel the ticker
    pub fn stop(&mut self) {
        self.ticker = None;
        self.last_frame = None;
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_some()
    }

    /// Update the heartbeat clock (call on every inbound frame)
    pub fn record_frame(&mut self, at: Instant) {
        if self.is_running() {
            self.last_frame = Some(at);
        }
    }

    /// Time since the last frame, if it exceeds the stale threshold
    pub fn stale_for(&self, now: Instant) -> Option<Duration> {
        let elapsed = now.saturating_duration_since(self.last_frame?);
        (elapsed > self.stale_threshold).then_some(elapsed)
    }

    /// Wait for the next tick and report staleness at that moment
    ///
    /// Never completes while stopped, so it can sit in a `select!` branch
    /// unconditionally.
    pub async fn tick(&mut self) -> Option<Duration> {
        match self.ticker.as_mut() {
            Some(ticker) => {
                ticker.tick().await;
                self.stale_for(Instant::now())
            }
            None => std::future::pending().await,
        }
    }
}
