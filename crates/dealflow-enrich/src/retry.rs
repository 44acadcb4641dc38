//! Exponential backoff for calls to external services.

use std::time::Duration;

use tracing::warn;

use dealflow_contracts::error::DealflowResult;

/// Retry schedule: attempt `n` (0-based) waits `base_delay × 2^n`, capped at
/// `max_delay`, before the next try. Only transient errors are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// A policy that never sleeps, for tests and demos.
    pub fn immediate(max_attempts: u32) -> Self {
        Self { max_attempts, base_delay: Duration::ZERO, max_delay: Duration::ZERO }
    }

    /// The wait after failed attempt `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Call `op` until it succeeds, fails with a non-transient error, or
    /// `max_attempts` is used up. `op` receives the 0-based attempt number.
    pub fn run<T>(&self, mut op: impl FnMut(u32) -> DealflowResult<T>) -> DealflowResult<T> {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt + 1 < attempts => {
                    let delay = self.delay_for(attempt);
                    let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
                    warn!(attempt, delay_ms, error = %err, "transient failure, retrying");
                    if !delay.is_zero() {
                        std::thread::sleep(delay);
                    }
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
