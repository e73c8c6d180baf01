//! Retry-with-ceiling policy for external service calls
//!
//! One policy type is parameterized per call site (generator slot, analyzer
//! call, summarizer narrative, embedding, answer generation) instead of each
//! worker carrying its own retry loop.
//!
//! **Algorithm:**
//! 1. Run the operation under `per_attempt_timeout`
//! 2. If successful, return the value with the attempt count
//! 3. On failure (a timeout counts as a failure):
//!    a. Non-retryable error: return `RetryError::Fatal` immediately
//!    b. Attempts remaining: log WARN, back off, retry
//!    c. Attempts exhausted: return `RetryError::Exhausted` with the last error

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Errors the policy can classify and synthesize on timeout
pub trait Retryable: Display {
    /// Whether another attempt may succeed
    fn is_retryable(&self) -> bool;

    /// Error representing an attempt that exceeded its timeout
    fn timed_out(after: Duration) -> Self;
}

/// Delay between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    None,
    Fixed(Duration),
    /// Doubles after every failed attempt, capped at `max`
    Exponential { initial: Duration, max: Duration },
}

impl Backoff {
    /// Delay after the given failed attempt (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match *self {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed(d) => d,
            Backoff::Exponential { initial, max } => {
                let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
                initial.saturating_mul(factor).min(max)
            }
        }
    }
}

/// Successful result plus the attempt that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct Attempted<T> {
    pub value: T,
    pub attempts: u32,
}

/// Terminal outcome of a failed retry sequence
#[derive(Debug, Error)]
pub enum RetryError<E: Display> {
    /// Every attempt failed with a retryable error
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },

    /// A non-retryable error stopped the sequence early
    #[error("failed on attempt {attempt}: {error}")]
    Fatal { attempt: u32, error: E },
}

impl<E: Display> RetryError<E> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. } => *attempts,
            RetryError::Fatal { attempt, .. } => *attempt,
        }
    }

    /// The last underlying error
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Exhausted { last, .. } => last,
            RetryError::Fatal { error, .. } => error,
        }
    }
}

/// Retry-with-ceiling policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub per_attempt_timeout: Duration,
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// Single attempt bounded by `timeout`
    pub fn once(timeout: Duration) -> Self {
        Self {
            max_attempts: 1,
            per_attempt_timeout: timeout,
            backoff: Backoff::None,
        }
    }

    pub fn new(max_attempts: u32, per_attempt_timeout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            per_attempt_timeout,
            backoff: Backoff::None,
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Run `operation`, retrying errors that report themselves retryable
    pub async fn run<F, Fut, T, E>(
        &self,
        operation_name: &str,
        operation: F,
    ) -> Result<Attempted<T>, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable,
    {
        self.run_classified(operation_name, E::is_retryable, operation)
            .await
    }

    /// Run `operation` with a call-site specific retry classification
    pub async fn run_classified<F, Fut, T, E, C>(
        &self,
        operation_name: &str,
        classify: C,
        mut operation: F,
    ) -> Result<Attempted<T>, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable,
        C: Fn(&E) -> bool,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let outcome = match tokio::time::timeout(self.per_attempt_timeout, operation()).await {
                Ok(result) => result,
                Err(_) => Err(E::timed_out(self.per_attempt_timeout)),
            };

            let err = match outcome {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::debug!(
                            operation = operation_name,
                            attempt,
                            "Operation succeeded after retry"
                        );
                    }
                    return Ok(Attempted {
                        value,
                        attempts: attempt,
                    });
                }
                Err(err) => err,
            };

            if !classify(&err) {
                return Err(RetryError::Fatal {
                    attempt,
                    error: err,
                });
            }

            if attempt >= max_attempts {
                if max_attempts > 1 {
                    tracing::error!(
                        operation = operation_name,
                        attempt,
                        error = %err,
                        "Operation failed: attempts exhausted"
                    );
                }
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last: err,
                });
            }

            let delay = self.backoff.delay_after(attempt);
            tracing::warn!(
                operation = operation_name,
                attempt,
                remaining = max_attempts - attempt,
                backoff_ms = delay.as_millis() as u64,
                error = %err,
                "Operation failed, will retry"
            );

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[derive(Debug, PartialEq)]
    enum TestError {
        Transient,
        Permanent,
        TimedOut,
    }

    impl Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    impl Retryable for TestError {
        fn is_retryable(&self) -> bool {
            !matches!(self, TestError::Permanent)
        }

        fn timed_out(_after: Duration) -> Self {
            TestError::TimedOut
        }
    }

    #[tokio::test]
    async fn test_succeeds_first_attempt() {
        let policy = RetryPolicy::new(3, Duration::from_secs(1));
        let result = policy
            .run("test_op", || async { Ok::<_, TestError>(42) })
            .await
            .unwrap();
        assert_eq!(result, Attempted { value: 42, attempts: 1 });
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let policy = RetryPolicy::new(3, Duration::from_secs(1));
        let calls = Arc::new(AtomicU32::new(0));

        let counter = calls.clone();
        let result = policy
            .run("test_op", move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(TestError::Transient)
                    } else {
                        Ok("ok")
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(result.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausted_after_max_attempts() {
        let policy = RetryPolicy::new(3, Duration::from_secs(1));
        let calls = Arc::new(AtomicU32::new(0));

        let counter = calls.clone();
        let err = policy
            .run("test_op", move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(TestError::Transient) }
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(matches!(err, RetryError::Exhausted { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn test_permanent_error_stops_immediately() {
        let policy = RetryPolicy::new(5, Duration::from_secs(1));
        let calls = Arc::new(AtomicU32::new(0));

        let counter = calls.clone();
        let err = policy
            .run("test_op", move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(TestError::Permanent) }
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(err.into_inner(), TestError::Permanent);
    }

    #[tokio::test]
    async fn test_classifier_overrides_error_kind() {
        let policy = RetryPolicy::new(2, Duration::from_secs(1));
        let err = policy
            .run_classified("test_op", |_| true, || async {
                Err::<(), _>(TestError::Permanent)
            })
            .await
            .unwrap_err();
        assert_eq!(err.attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_failed_attempt() {
        let policy = RetryPolicy::new(2, Duration::from_millis(50));
        let err = policy
            .run("slow_op", || async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok::<_, TestError>(())
            })
            .await
            .unwrap_err();

        assert_eq!(err.attempts(), 2);
        assert_eq!(err.into_inner(), TestError::TimedOut);
    }

    #[test]
    fn test_exponential_backoff_is_capped() {
        let backoff = Backoff::Exponential {
            initial: Duration::from_millis(10),
            max: Duration::from_millis(1000),
        };
        assert_eq!(backoff.delay_after(1), Duration::from_millis(10));
        assert_eq!(backoff.delay_after(2), Duration::from_millis(20));
        assert_eq!(backoff.delay_after(4), Duration::from_millis(80));
        assert_eq!(backoff.delay_after(20), Duration::from_millis(1000));
        assert_eq!(Backoff::None.delay_after(3), Duration::ZERO);
    }
}
