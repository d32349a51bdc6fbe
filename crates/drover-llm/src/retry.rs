//! Exponential-backoff retry policy.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use drover_core::{DroverError, RequestContext, Result};

/// Retry configuration for provider calls.
///
/// Only errors whose [`DroverError::is_retryable`] is true (transport
/// failures and rate-limit backpressure) are retried; everything else is
/// surfaced immediately. Sleeps observe request cancellation, and an attempt
/// whose preceding backoff would certainly overrun the context deadline is
/// never started.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub initial_interval: Duration,
    pub backoff_coefficient: f64,
    pub max_interval: Duration,
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(1),
            backoff_coefficient: 2.0,
            max_interval: Duration::from_secs(100),
            max_attempts: 3,
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_initial_interval(mut self, interval: Duration) -> Self {
        self.initial_interval = interval;
        self
    }

    pub fn with_backoff_coefficient(mut self, coefficient: f64) -> Self {
        self.backoff_coefficient = coefficient;
        self
    }

    pub fn with_max_interval(mut self, interval: Duration) -> Self {
        self.max_interval = interval;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Backoff before attempt `n` (1-based; the first attempt has none).
    fn backoff_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let exponent = (attempt - 2) as i32;
        let interval = self
            .initial_interval
            .mul_f64(self.backoff_coefficient.powi(exponent));
        interval.min(self.max_interval)
    }

    /// Run `operation` under this policy.
    pub async fn run<T, F, Fut>(&self, ctx: &RequestContext, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            ctx.ensure_active()?;

            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.max_attempts => {
                    let backoff = self.backoff_before(attempt + 1);
                    if let Some(remaining) = ctx.remaining() {
                        if backoff >= remaining {
                            debug!(
                                attempt,
                                backoff_ms = backoff.as_millis() as u64,
                                "skipping retry, backoff would exceed the request deadline"
                            );
                            return Err(err);
                        }
                    }

                    debug!(
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %err,
                        "retrying after transient failure"
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(backoff) => {}
                        _ = ctx.cancellation().cancelled() => return Err(DroverError::Cancelled),
                    }
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_policy(attempts: u32) -> RetryPolicy {
        RetryPolicy::new()
            .with_initial_interval(Duration::from_millis(1))
            .with_max_attempts(attempts)
    }

    #[tokio::test]
    async fn retries_transient_errors_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let ctx = RequestContext::new();

        let result = fast_policy(5)
            .run(&ctx, move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(DroverError::Transport("connection reset".into()))
                    } else {
                        Ok("done")
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(result, "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_non_retryable_errors() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let ctx = RequestContext::new();

        let err = fast_policy(5)
            .run::<(), _, _>(&ctx, move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(DroverError::Auth("bad key".into()))
                }
            })
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "AUTH_ERROR");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let ctx = RequestContext::new();

        let err = fast_policy(3)
            .run::<(), _, _>(&ctx, move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(DroverError::RateLimited("429".into()))
                }
            })
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "RATE_LIMITED");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn last_attempt_is_skipped_when_backoff_exceeds_deadline() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let ctx = RequestContext::new().with_deadline(Duration::from_millis(50));

        let policy = RetryPolicy::new()
            .with_initial_interval(Duration::from_secs(30))
            .with_max_attempts(3);

        let err = policy
            .run::<(), _, _>(&ctx, move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(DroverError::Transport("flaky".into()))
                }
            })
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "TRANSPORT_ERROR");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancelled_context_stops_before_the_first_attempt() {
        let ctx = RequestContext::new();
        ctx.cancel();

        let err = fast_policy(3)
            .run::<(), _, _>(&ctx, || async { Ok(()) })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "CANCELLED");
    }

    #[test]
    fn backoff_grows_exponentially_and_caps() {
        let policy = RetryPolicy::new()
            .with_initial_interval(Duration::from_secs(1))
            .with_backoff_coefficient(2.0)
            .with_max_interval(Duration::from_secs(3));

        assert_eq!(policy.backoff_before(1), Duration::ZERO);
        assert_eq!(policy.backoff_before(2), Duration::from_secs(1));
        assert_eq!(policy.backoff_before(3), Duration::from_secs(2));
        assert_eq!(policy.backoff_before(4), Duration::from_secs(3));
        assert_eq!(policy.backoff_before(5), Duration::from_secs(3));
    }
}
