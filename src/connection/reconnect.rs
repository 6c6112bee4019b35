//! Reconnection policy
//!
//! Exponential backoff: the retry scheduled with `n` previous attempts waits
//! `reconnect_delay * 2^n`, optionally capped at `max_reconnect_delay`. At
//! most one retry timer exists at a time.

use std::pin::Pin;
use std::time::Duration;
use tokio::time::{sleep, Sleep};

use crate::config::LinkConfig;

/// A retry that has been armed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledRetry {
    /// 1-based attempt number
    pub attempt: u32,
    pub delay: Duration,
}

/// Outcome of asking the policy for another attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Scheduled(ScheduledRetry),
    /// A retry timer is already armed; nothing changed
    AlreadyPending,
    /// Attempt budget spent
    Exhausted { attempts: u32 },
}

/// Retry bookkeeping and the single pending retry timer
#[derive(Debug)]
pub struct ReconnectPolicy {
    base_delay: Duration,
    max_delay: Option<Duration>,
    max_attempts: u32,
    attempts: u32,
    pending: Option<Pin<Box<Sleep>>>,
}

impl ReconnectPolicy {
    pub fn new(base_delay: Duration, max_delay: Option<Duration>, max_attempts: u32) -> Self {
        Self {
            base_delay,
            max_delay,
            max_attempts,
            attempts: 0,
            pending: None,
        }
    }

    pub fn from_config(config: &LinkConfig) -> Self {
        Self::new(
            config.reconnect_delay,
            config.max_reconnect_delay,
            config.max_reconnect_attempts,
        )
    }

    /// Attempts made since the last reset
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Delay for the retry with 0-based index `attempt_index`
    pub fn delay_for(&self, attempt_index: u32) -> Duration {
        let delay = 2u32
            .checked_pow(attempt_index)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .unwrap_or(Duration::MAX);

        match self.max_delay {
            Some(max) => delay.min(max),
            None => delay,
        }
    }

    /// Arm the retry timer if the budget allows and none is pending
    pub fn schedule(&mut self) -> RetryDecision {
        if self.pending.is_some() {
            return RetryDecision::AlreadyPending;
        }
        if self.attempts >= self.max_attempts {
            return RetryDecision::Exhausted {
                attempts: self.attempts,
            };
        }

        let delay = self.delay_for(self.attempts);
        self.attempts += 1;
        self.pending = Some(Box::pin(sleep(delay)));

        RetryDecision::Scheduled(ScheduledRetry {
            attempt: self.attempts,
            delay,
        })
    }

    /// Cancel the pending retry, if any
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    /// Cancel the pending retry and restore the full attempt budget
    pub fn reset(&mut self) {
        self.cancel();
        self.attempts = 0;
    }

    /// Wait for the pending retry to fall due
    ///
    /// Never completes while nothing is scheduled.
    pub async fn due(&mut self) {
        match self.pending.as_mut() {
            Some(timer) => {
                timer.as_mut().await;
                self.pending = None;
            }
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> ReconnectPolicy {
        ReconnectPolicy::new(Duration::from_millis(1000), None, 5)
    }

    fn delays(policy: &mut ReconnectPolicy) -> Vec<u64> {
        let mut out = Vec::new();
        loop {
            match policy.schedule() {
                RetryDecision::Scheduled(retry) => {
                    out.push(retry.delay.as_millis() as u64);
                    policy.cancel();
                }
                RetryDecision::Exhausted { .. } => return out,
                RetryDecision::AlreadyPending => unreachable!(),
            }
        }
    }

    #[test]
    fn test_delay_doubles_per_attempt() {
        let p = policy();
        for i in 0..8 {
            assert_eq!(p.delay_for(i), Duration::from_millis(1000 * 2u64.pow(i)));
        }
    }

    #[test]
    fn test_ceiling_caps_delay() {
        let p = ReconnectPolicy::new(Duration::from_millis(1000), Some(Duration::from_secs(30)), 10);
        assert_eq!(p.delay_for(4), Duration::from_secs(16));
        assert_eq!(p.delay_for(5), Duration::from_secs(30));
        assert_eq!(p.delay_for(9), Duration::from_secs(30));
    }

    #[test]
    fn test_huge_index_saturates() {
        let p = policy();
        assert_eq!(p.delay_for(200), Duration::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_budget_sequence() {
        let mut p = policy();
        assert_eq!(delays(&mut p), vec![1000, 2000, 4000, 8000, 16000]);
        assert_eq!(p.schedule(), RetryDecision::Exhausted { attempts: 5 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_one_pending_retry() {
        let mut p = policy();
        assert!(matches!(p.schedule(), RetryDecision::Scheduled(ScheduledRetry { attempt: 1, .. })));
        assert_eq!(p.schedule(), RetryDecision::AlreadyPending);
        assert_eq!(p.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_restores_budget() {
        let mut p = policy();
        delays(&mut p);
        p.reset();

        assert_eq!(
            p.schedule(),
            RetryDecision::Scheduled(ScheduledRetry {
                attempt: 1,
                delay: Duration::from_millis(1000)
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_due_fires_after_delay() {
        let mut p = policy();
        p.schedule();
        let start = tokio::time::Instant::now();

        p.due().await;
        assert!(start.elapsed() >= Duration::from_millis(1000));
        assert!(!p.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_retry_never_fires() {
        let mut p = policy();
        p.schedule();
        p.cancel();

        let result = tokio::time::timeout(Duration::from_secs(60), p.due()).await;
        assert!(result.is_err());
    }
}
