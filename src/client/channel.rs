//! Realtime channel state machine.

use std::time::Duration;

use serde::Serialize;

/// Where the client's delivery channel stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ChannelState {
    #[default]
    Idle,
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
    /// Terminal: the socket was given up for good
    Polling,
}

/// What follows a failed or closed connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    Retry { attempt: u32, delay: Duration },
    FallBackToPolling,
}

/// Exponential reconnect backoff with an attempt ceiling.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max_attempts: u32,
    attempts: u32,
}

impl Backoff {
    pub fn new(base: Duration, max_attempts: u32) -> Self {
        Self {
            base,
            max_attempts,
            attempts: 0,
        }
    }

    /// Delay before attempt `attempt` (1-based): `base * 2^(attempt - 1)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor)
    }

    /// Record a failure and decide what to do next.
    pub fn on_failure(&mut self) -> NextStep {
        self.attempts += 1;
        if self.attempts > self.max_attempts {
            NextStep::FallBackToPolling
        } else {
            NextStep::Retry {
                attempt: self.attempts,
                delay: self.delay_for(self.attempts),
            }
        }
    }

    /// A connection was established.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}
