use std::thread;
use std::time::Duration;

use tracing::{error, info};

use crate::error::RetryError;

/// Fixed-backoff retry budget. Bounded unless a caller opts into
/// [`RetryPolicy::forever`] explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub delay: Duration,
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    pub const fn bounded(max_attempts: u32, delay: Duration) -> Self {
        Self {
            delay,
            max_attempts: Some(max_attempts),
        }
    }

    pub const fn forever(delay: Duration) -> Self {
        Self {
            delay,
            max_attempts: None,
        }
    }

    /// Run `op` until it succeeds or the budget is spent, sleeping `delay`
    /// between attempts.
    pub fn run<T, E, F>(&self, operation: &'static str, mut op: F) -> Result<T, RetryError<E>>
    where
        E: std::error::Error + 'static,
        F: FnMut() -> Result<T, E>,
    {
        let mut attempts = 0u32;
        loop {
            attempts = attempts.saturating_add(1);
            match op() {
                Ok(value) => return Ok(value),
                Err(err) => {
                    error!(operation, attempts, error = %err, "attempt failed");
                    if self.max_attempts.is_some_and(|max| attempts >= max) {
                        return Err(RetryError {
                            operation,
                            attempts,
                            last: err,
                        });
                    }
                    info!(
                        operation,
                        "trying again in {}",
                        humantime::format_duration(self.delay)
                    );
                    thread::sleep(self.delay);
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::bounded(3, Duration::from_secs(5))
    }
}
