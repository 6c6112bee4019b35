//! Link configuration
//!
//! Defaults come from [`pulse_shared::link`]; [`LinkConfig::from_env`]
//! overlays `PULSE_LINK_*` environment variables.

use pulse_shared::link;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// What to do when the heartbeat monitor finds the link stale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StalePolicy {
    /// Publish a staleness warning only
    #[default]
    Observe,
    /// Tear the link down and go through the reconnect path
    Reconnect,
}

impl FromStr for StalePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "observe" => Ok(StalePolicy::Observe),
            "reconnect" => Ok(StalePolicy::Reconnect),
            other => Err(format!("unknown stale policy: {other}")),
        }
    }
}

/// Configuration for the link manager
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Device endpoint (`ws://host:port/path` or `tcp://host:port`)
    pub endpoint: String,
    /// Automatic reconnect attempts before giving up
    pub max_reconnect_attempts: u32,
    /// Reconnection delay (initial)
    pub reconnect_delay: Duration,
    /// Maximum reconnection delay, `None` for unbounded growth
    pub max_reconnect_delay: Option<Duration>,
    /// Heartbeat check interval
    pub heartbeat_interval: Duration,
    /// Silence longer than this marks the link stale
    pub stale_threshold: Duration,
    pub stale_policy: StalePolicy,
    /// Transport open timeout
    pub connect_timeout: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            endpoint: "ws://127.0.0.1:81".into(),
            max_reconnect_attempts: link::MAX_RECONNECT_ATTEMPTS,
            reconnect_delay: Duration::from_millis(link::RECONNECT_BASE_DELAY_MS),
            max_reconnect_delay: Some(Duration::from_millis(link::MAX_RECONNECT_DELAY_MS)),
            heartbeat_interval: Duration::from_millis(link::HEARTBEAT_INTERVAL_MS),
            stale_threshold: Duration::from_millis(link::STALE_THRESHOLD_MS),
            stale_policy: StalePolicy::Observe,
            connect_timeout: Duration::from_millis(link::CONNECT_TIMEOUT_MS),
        }
    }
}

impl LinkConfig {
    /// Load from environment with defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(v) = lookup("PULSE_LINK_ENDPOINT") {
            config.endpoint = v;
        }
        if let Some(v) = parse(&lookup, "PULSE_LINK_MAX_RECONNECT_ATTEMPTS") {
            config.max_reconnect_attempts = v;
        }
        if let Some(ms) = parse(&lookup, "PULSE_LINK_RECONNECT_DELAY_MS") {
            config.reconnect_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = parse::<u64>(&lookup, "PULSE_LINK_MAX_RECONNECT_DELAY_MS") {
            // 0 disables the ceiling
            config.max_reconnect_delay = (ms > 0).then(|| Duration::from_millis(ms));
        }
        match parse::<u64>(&lookup, "PULSE_LINK_HEARTBEAT_INTERVAL_MS") {
            Some(0) => warn!("Ignoring PULSE_LINK_HEARTBEAT_INTERVAL_MS=0, interval must be non-zero"),
            Some(ms) => config.heartbeat_interval = Duration::from_millis(ms),
            None => {}
        }
        if let Some(ms) = parse(&lookup, "PULSE_LINK_STALE_THRESHOLD_MS") {
            config.stale_threshold = Duration::from_millis(ms);
        }
        if let Some(policy) = parse(&lookup, "PULSE_LINK_STALE_POLICY") {
            config.stale_policy = policy;
        }
        if let Some(ms) = parse(&lookup, "PULSE_LINK_CONNECT_TIMEOUT_MS") {
            config.connect_timeout = Duration::from_millis(ms);
        }

        config
    }
}

fn parse<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("Ignoring invalid {}={:?}", key, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = LinkConfig::default();
        assert_eq!(config.max_reconnect_attempts, 5);
        assert_eq!(config.reconnect_delay, Duration::from_millis(1000));
        assert_eq!(config.heartbeat_interval, Duration::from_millis(2000));
        assert_eq!(config.stale_threshold, Duration::from_millis(5000));
        assert_eq!(config.stale_policy, StalePolicy::Observe);
    }

    #[test]
    fn test_env_overrides() {
        let config = LinkConfig::from_lookup(lookup(&[
            ("PULSE_LINK_ENDPOINT", "tcp://10.0.0.2:9000"),
            ("PULSE_LINK_MAX_RECONNECT_ATTEMPTS", "8"),
            ("PULSE_LINK_MAX_RECONNECT_DELAY_MS", "0"),
            ("PULSE_LINK_STALE_POLICY", "Reconnect"),
        ]));

        assert_eq!(config.endpoint, "tcp://10.0.0.2:9000");
        assert_eq!(config.max_reconnect_attempts, 8);
        assert_eq!(config.max_reconnect_delay, None);
        assert_eq!(config.stale_policy, StalePolicy::Reconnect);
    }

    #[test]
    fn test_zero_heartbeat_interval_is_ignored() {
        let config = LinkConfig::from_lookup(lookup(&[
            ("PULSE_LINK_HEARTBEAT_INTERVAL_MS", "0"),
            ("PULSE_LINK_STALE_THRESHOLD_MS", "8000"),
        ]));

        assert_eq!(config.heartbeat_interval, Duration::from_millis(2000));
        assert_eq!(config.stale_threshold, Duration::from_millis(8000));
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = LinkConfig::from_lookup(lookup(&[
            ("PULSE_LINK_RECONNECT_DELAY_MS", "soon"),
            ("PULSE_LINK_STALE_POLICY", "panic"),
        ]));

        assert_eq!(config.reconnect_delay, Duration::from_millis(1000));
        assert_eq!(config.stale_policy, StalePolicy::Observe);
    }
}
