//! Reconnection backoff
//!
//! Exponential from `initial_delay`, doubling per failed attempt, capped at
//! `max_delay`. With jitter enabled each delay is drawn uniformly from
//! `[d/2, d]` so a fleet of clients does not reconnect in lockstep.

use rand::Rng;
use std::time::Duration;

/// Reconnection policy for the channel supervisor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Abandon a single connection attempt after this long
    pub connect_timeout: Duration,
    pub jitter: bool,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(60),
            jitter: true,
        }
    }
}

/// Backoff state for one supervisor
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: ReconnectPolicy,
    attempt: u32,
}

impl Backoff {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self { policy, attempt: 0 }
    }

    /// Un-jittered delay for the current attempt
    pub fn ceiling(&self) -> Duration {
        let factor = 2u32.saturating_pow(self.attempt.min(16));
        self.policy
            .initial_delay
            .saturating_mul(factor)
            .min(self.policy.max_delay)
    }

    /// Delay before the next attempt; advances the attempt counter
    pub fn next_delay(&mut self) -> Duration {
        let ceiling = self.ceiling();
        self.attempt = self.attempt.saturating_add(1);
        if !self.policy.jitter {
            return ceiling;
        }
        let max_ms = u64::try_from(ceiling.as_millis()).unwrap_or(u64::MAX);
        let min_ms = max_ms / 2;
        Duration::from_millis(rand::thread_rng().gen_range(min_ms..=max_ms))
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}
