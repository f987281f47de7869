//! Bounded retry policy for upstream requests.

use crate::source::SourceError;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Classification for retry behavior.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Transient failure (timeout, connection, 429, 5xx). Try again after a delay.
    Retryable,
    /// Retrying won't help.
    Fatal,
}

/// Bounded exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubled for each one after.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay to wait after the given failed attempt (1-indexed).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1 << exponent)
    }

    /// Run `operation` until it succeeds, fails fatally, or attempts run out.
    ///
    /// Fatal errors are returned as-is. Running out of attempts on a
    /// retryable error yields [`SourceError::Exhausted`].
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, SourceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if e.retry_class() == RetryClass::Fatal => return Err(e),
                Err(e) if attempt >= self.max_attempts => {
                    return Err(SourceError::Exhausted {
                        attempts: attempt,
                        source: Box::new(e),
                    });
                }
                Err(e) => {
                    let delay = self.delay_after(attempt);
                    warn!(
                        "Upstream request failed (attempt {}/{}): {}. Retrying in {:?}",
                        attempt, self.max_attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(1))
    }

    #[test]
    fn test_delay_doubles() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100));
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
        assert_eq!(policy.delay_after(3), Duration::from_millis(400));
    }

    #[test]
    fn test_zero_attempts_clamped() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result = fast_policy(3)
            .run(|| async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(SourceError::Timeout(1))
                } else {
                    Ok("done")
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fatal_error_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: Result<(), _> = fast_policy(5)
            .run(|| async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(SourceError::GraphQl("bad field".to_string()))
            })
            .await;

        assert!(matches!(result, Err(SourceError::GraphQl(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhausted_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: Result<(), _> = fast_policy(3)
            .run(|| async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(SourceError::Http {
                    status: 503,
                    body: "unavailable".to_string(),
                })
            })
            .await;

        match result {
            Err(SourceError::Exhausted { attempts, source }) => {
                assert_eq!(attempts, 3);
                assert!(matches!(*source, SourceError::Http { status: 503, .. }));
            }
            other => panic!("expected exhausted error, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
