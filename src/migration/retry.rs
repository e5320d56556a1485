//! Bounded retry with doubling back-off for remote calls.

use std::time::Duration;
use tracing::warn;

use super::error::{MigrationError, MigrationResult};
use crate::gmail::{RemoteError, RemoteResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            initial_backoff: Duration::from_secs(15),
            max_backoff: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Same attempt budget without sleeping.
    pub fn immediate(attempts: u32) -> Self {
        Self {
            attempts,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Wait after the given failed attempt (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Run `op` until it succeeds, fails permanently, or the budget is spent.
    pub fn run<T>(
        &self,
        context: &str,
        retryable: impl Fn(&RemoteError) -> bool,
        mut op: impl FnMut() -> RemoteResult<T>,
    ) -> MigrationResult<T> {
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(source) if retryable(&source) => {
                    if attempt >= self.attempts {
                        return Err(MigrationError::RetriesExhausted {
                            context: context.to_string(),
                            attempts: attempt,
                            source,
                        });
                    }
                    let wait = self.backoff(attempt);
                    warn!(%context, attempt, wait_secs = wait.as_secs(), error = %source, "transient failure, retrying");
                    std::thread::sleep(wait);
                    attempt += 1;
                }
                Err(source) => {
                    return Err(MigrationError::Remote {
                        context: context.to_string(),
                        source,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_secs(15));
        assert_eq!(policy.backoff(2), Duration::from_secs(30));
        assert_eq!(policy.backoff(3), Duration::from_secs(60));
        assert_eq!(policy.backoff(4), Duration::from_secs(60));
    }

    #[test]
    fn test_succeeds_after_transient_failures() {
        let calls = Cell::new(0);
        let result = RetryPolicy::immediate(3).run("op", RemoteError::is_transient, || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(RemoteError::api(503, "busy"))
            } else {
                Ok(42)
            }
        });
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_exhausted_budget() {
        let calls = Cell::new(0);
        let result: MigrationResult<()> =
            RetryPolicy::immediate(3).run("op", RemoteError::is_transient, || {
                calls.set(calls.get() + 1);
                Err(RemoteError::api(429, "slow down"))
            });
        assert!(matches!(
            result,
            Err(MigrationError::RetriesExhausted { attempts: 3, .. })
        ));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_permanent_error_not_retried() {
        let calls = Cell::new(0);
        let result: MigrationResult<()> =
            RetryPolicy::immediate(3).run("op", RemoteError::is_transient, || {
                calls.set(calls.get() + 1);
                Err(RemoteError::api(404, "missing"))
            });
        assert!(matches!(result, Err(MigrationError::Remote { .. })));
        assert_eq!(calls.get(), 1);
    }
}
