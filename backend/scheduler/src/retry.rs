//! Retry engine: linear backoff for failed operation attempts.
//!
//! The delay before retry `n` (zero-indexed count of retries already made)
//! is `base_delay_ms * (n + 1)`.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Retry policy configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt.
    pub max_attempts: u32,
    /// Base delay between retries in milliseconds.
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            base_delay_ms: 1_000,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay_ms: u64) -> Self {
        Self {
            max_attempts,
            base_delay_ms,
        }
    }

    /// Delay before the retry that follows `current_attempt` retries.
    pub fn delay_for(&self, current_attempt: u32) -> Duration {
        let factor = u64::from(current_attempt) + 1;
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }

    pub fn should_retry(&self, current_attempt: u32) -> bool {
        current_attempt < self.max_attempts
    }

    /// Start a fresh plan with the attempt counter at zero.
    pub fn plan(&self) -> RetryPlan {
        RetryPlan {
            max_attempts: self.max_attempts,
            base_delay_ms: self.base_delay_ms,
            current_attempt: 0,
        }
    }
}

/// Outcome of asking the plan what to do after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait `delay`, then run attempt number `attempt`.
    Retry { attempt: u32, delay: Duration },
    Exhausted { attempts_made: u32 },
}

/// Per-execution retry bookkeeping. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RetryPlan {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub current_attempt: u32,
}

impl RetryPlan {
    fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, self.base_delay_ms)
    }

    pub fn reset(&mut self) {
        self.current_attempt = 0;
    }

    /// Record a failed attempt and decide what happens next.
    ///
    /// Scheduling a retry increments `current_attempt`; exhaustion leaves it
    /// untouched.
    pub fn record_failure(&mut self, error: &str) -> RetryDecision {
        let policy = self.policy();
        if policy.should_retry(self.current_attempt) {
            let delay = policy.delay_for(self.current_attempt);
            self.current_attempt += 1;
            debug!(
                attempt = self.current_attempt,
                max = self.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Attempt failed, will retry"
            );
            RetryDecision::Retry {
                attempt: self.current_attempt,
                delay,
            }
        } else {
            warn!(
                attempts = self.current_attempt + 1,
                error = %error,
                "Retry policy exhausted"
            );
            RetryDecision::Exhausted {
                attempts_made: self.current_attempt + 1,
            }
        }
    }
}
