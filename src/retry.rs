//! Bounded retry with exponential backoff for storage operations
//!
//! Only failures the caller classifies as transient are retried. The last
//! error is returned once attempts are exhausted; nothing is dropped.

use std::thread;
use std::time::Duration;

/// Retry policy for blocking storage calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one (at least 1)
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles after each retry
    pub initial_backoff: Duration,
    /// Upper bound on any single delay
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Delay before attempt number `attempt + 1` (1-based `attempt`).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Runs `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// `on_retry` is called with the failed attempt number and its error
    /// before sleeping.
    pub fn run<T, E>(
        &self,
        mut op: impl FnMut() -> Result<T, E>,
        is_transient: impl Fn(&E) -> bool,
        mut on_retry: impl FnMut(u32, &E),
    ) -> Result<T, E> {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if attempt < max_attempts && is_transient(&e) => {
                    on_retry(attempt, &e);
                    thread::sleep(self.backoff_for(attempt));
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
