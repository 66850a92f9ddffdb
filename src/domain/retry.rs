//! Bounded retry for calls to external collaborators.

use crate::domain::error::TraderError;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn no_delay(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            delay: Duration::ZERO,
        }
    }
}

/// Runs `call` until it succeeds, fails with a non-transient error, or the
/// attempt budget is spent. Returns the last error in the latter cases.
pub fn with_retry<T>(
    policy: &RetryPolicy,
    what: &str,
    mut call: impl FnMut() -> Result<T, TraderError>,
) -> Result<T, TraderError> {
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match call() {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < attempts => {
                tracing::warn!(what, attempt, max_attempts = attempts, error = %e, "transient failure, retrying");
                if !policy.delay.is_zero() {
                    std::thread::sleep(policy.delay);
                }
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
