//! Bounded exponential-backoff retry for remote calls
//!
//! Wraps one remote operation in a retry loop driven by the error
//! classification from [`crate::errors::AppError`]. This is the single
//! place that encodes which failures are transient:
//!
//! - 401 is raised immediately, never retried
//! - 429 is retried up to `max_retries` times with `backoff_base * 2^attempt`
//!   delays (1s, 2s, 4s at the default base)
//! - 5xx shares the 429 schedule
//! - every other failure propagates immediately
//!
//! Exhausting all retries re-raises the last observed failure.

use std::future::Future;
use std::time::Duration;

use crate::errors::{AppError, AppResult};

/// Retry schedule for one remote operation
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum retries after the initial attempt
    pub max_retries: u32,
    /// Base delay, doubled per attempt
    pub backoff_base: Duration,
}

impl RetryPolicy {
    /// Build the policy from configured knobs
    pub fn new(max_retries: u32, backoff_base_ms: u64) -> Self {
        Self {
            max_retries,
            backoff_base: Duration::from_millis(backoff_base_ms),
        }
    }

    /// Run `operation`, retrying transient failures with backoff
    ///
    /// The operation is a zero-argument async closure; each attempt invokes
    /// it afresh. Delays are awaited sleeps local to this call, so tests can
    /// drive the schedule with tokio's paused clock.
    pub async fn call<T, F, Fut>(&self, mut operation: F) -> AppResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let mut last_error = None;
        for attempt in 0..=self.max_retries {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if !err.is_transient() {
                        return Err(err);
                    }
                    if attempt < self.max_retries {
                        let delay = self.backoff_base * 2u32.pow(attempt);
                        tracing::debug!(
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            "transient provider failure, backing off: {err}"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    last_error = Some(err);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| AppError::Internal("retry loop exhausted without an error".to_owned())))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use tokio::time::Instant;

    use super::RetryPolicy;
    use crate::errors::AppError;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(3, 1_000)
    }

    /// Operation that fails with the given error builder N times, then succeeds
    fn flaky(
        failures: u32,
        error: impl Fn() -> AppError + Send + Sync + 'static,
    ) -> impl FnMut() -> std::pin::Pin<Box<dyn std::future::Future<Output = crate::errors::AppResult<u32>> + Send>>
    {
        let calls = Arc::new(AtomicU32::new(0));
        let error = Arc::new(error);
        move || {
            let calls = Arc::clone(&calls);
            let error = Arc::clone(&error);
            Box::pin(async move {
                let attempt = calls.fetch_add(1, Ordering::SeqCst);
                if attempt < failures {
                    Err(error())
                } else {
                    Ok(attempt)
                }
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn three_rate_limits_then_success_backs_off_1s_2s_4s() {
        let started = Instant::now();
        let result = policy()
            .call(flaky(3, || AppError::RateLimited("quota".to_owned())))
            .await
            .expect("must succeed on fourth attempt");
        assert_eq!(result, 3);
        // 1s + 2s + 4s of backoff under the paused clock.
        assert_eq!(started.elapsed(), Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn server_errors_share_the_rate_limit_schedule() {
        let started = Instant::now();
        let result = policy()
            .call(flaky(2, || AppError::from_status(503, "unavailable".to_owned())))
            .await
            .expect("must succeed on third attempt");
        assert_eq!(result, 2);
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn auth_failure_is_never_retried() {
        let started = Instant::now();
        let err = policy()
            .call(flaky(1, || AppError::AuthFailed("expired".to_owned())))
            .await
            .expect_err("must fail immediately");
        assert!(matches!(err, AppError::AuthFailed(_)));
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn non_transient_statuses_propagate_immediately() {
        let err = policy()
            .call(flaky(1, || AppError::from_status(400, "bad request".to_owned())))
            .await
            .expect_err("must fail immediately");
        assert!(matches!(err, AppError::Api { status: 400, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_reraises_the_last_failure() {
        let started = Instant::now();
        let err = policy()
            .call(flaky(10, || AppError::RateLimited("quota".to_owned())))
            .await
            .expect_err("must exhaust retries");
        assert!(matches!(err, AppError::RateLimited(_)));
        // Four attempts total with 1s/2s/4s between them; no sleep after the last.
        assert_eq!(started.elapsed(), Duration::from_secs(7));
    }
}
