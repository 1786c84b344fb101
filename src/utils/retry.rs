//! Retry utilities for resilient operations
//!
//! A single fixed-delay retry mechanism shared by session acquisition and
//! per-page extraction. Every retryable attempt is separated by the same
//! delay; an optional predicate lets callers stop early on errors that a
//! retry in place cannot fix.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one
    pub max_attempts: u32,

    /// Fixed pause between consecutive attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Create a new policy
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Create a policy from a millisecond delay
    pub fn with_delay_ms(max_attempts: u32, delay_ms: u64) -> Self {
        Self::new(max_attempts, Duration::from_millis(delay_ms))
    }

    /// Attempts actually performed; a zero budget still runs once
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Execute an operation with fixed-delay retries
///
/// The operation receives the 1-based attempt number. Returns the first
/// success, or the error of the last attempt.
///
/// # Example
///
/// ```no_run
/// use makler_crawler::utils::retry::{with_retry, RetryPolicy};
///
/// # async fn example() -> Result<(), String> {
/// let policy = RetryPolicy::with_delay_ms(3, 500);
/// let value = with_retry(&policy, |_attempt| async { Ok::<_, String>(42) }).await?;
/// # Ok(())
/// # }
/// ```
pub async fn with_retry<T, E, F, Fut>(policy: &RetryPolicy, operation: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    with_retry_if(policy, operation, |_| true).await
}

/// Execute an operation with fixed-delay retries, using a retry predicate
///
/// When `should_retry` returns `false` for an error, that error is
/// returned immediately without sleeping or further attempts.
pub async fn with_retry_if<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    mut operation: F,
    should_retry: P,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    P: Fn(&E) -> bool,
{
    let max_attempts = policy.attempts();
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(result) => {
                if attempt > 1 {
                    debug!(attempt, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) => {
                if !should_retry(&e) {
                    warn!(attempt, error = %e, "Non-retryable error encountered");
                    return Err(e);
                }

                if attempt >= max_attempts {
                    warn!(attempt, max_attempts, error = %e, "Retry budget exhausted");
                    return Err(e);
                }

                warn!(
                    attempt,
                    max_attempts,
                    delay_ms = policy.delay.as_millis() as u64,
                    error = %e,
                    "Operation failed, will retry"
                );
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    #[tokio::test]
    async fn test_retry_success_first_attempt() {
        let policy = RetryPolicy::with_delay_ms(3, 10);
        let result = with_retry(&policy, |_| async { Ok::<_, String>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_success_after_failures() {
        let policy = RetryPolicy::with_delay_ms(3, 500);
        let attempts = Arc::new(AtomicU32::new(0));
        let start = Instant::now();

        let result = with_retry(&policy, |_| {
            let attempts = Arc::clone(&attempts);
            async move {
                let count = attempts.fetch_add(1, Ordering::SeqCst);
                if count < 2 {
                    return Err("Simulated failure".to_string());
                }
                Ok(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(start.elapsed(), Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhausted() {
        let policy = RetryPolicy::with_delay_ms(2, 100);
        let attempts = AtomicU32::new(0);

        let result: Result<(), String> = with_retry(&policy, |n| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async move { Err(format!("Permanent failure #{n}")) }
        })
        .await;

        assert_eq!(result.unwrap_err(), "Permanent failure #2");
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_if_predicate_stops_early() {
        let policy = RetryPolicy::with_delay_ms(3, 500);
        let attempts = AtomicU32::new(0);
        let start = Instant::now();

        let result: Result<(), String> = with_retry_if(
            &policy,
            |_| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err("context lost".to_string()) }
            },
            |e| !e.contains("context lost"),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_zero_budget_runs_once() {
        let policy = RetryPolicy::with_delay_ms(0, 10);
        let attempts = AtomicU32::new(0);

        let _: Result<(), String> = with_retry(&policy, |_| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err("nope".to_string()) }
        })
        .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
