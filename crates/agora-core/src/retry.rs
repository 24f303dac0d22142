//! Bounded retries with exponential backoff and a hard per-call timeout.
//!
//! Every network or store call made from a scheduled job goes through
//! [`with_retry`], so a stalled dependency costs at most
//! [`RetryPolicy::worst_case`] before the job gives up.
//!
//! A timeout does not cancel work already handed to the platform or to the
//! blocking pool, so writes that must not land twice use
//! [`RetryPolicy::non_idempotent`] and are never repeated after a timeout.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::warn;

use crate::config::RetryConfig;

/// Jitter fraction applied to each delay (up to +10 %).
const JITTER_FRACTION: f64 = 0.10;

/// Errors that can be produced by a retried operation.
pub trait RetryableError: std::fmt::Display {
    /// Build the error reported when a single attempt exceeds its time budget.
    fn timed_out(ms: u64) -> Self;

    /// `false` for errors that will not go away by asking again
    /// (bad request, missing row, ...).
    fn is_retryable(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub call_timeout: Duration,
    /// Ask again after an attempt times out. Off for non-idempotent writes.
    pub retry_timeouts: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts.max(1),
            base_delay: Duration::from_millis(cfg.base_delay_ms),
            max_delay: Duration::from_millis(cfg.max_delay_ms),
            call_timeout: Duration::from_millis(cfg.call_timeout_ms),
            retry_timeouts: true,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no backoff. Useful where the caller already retries.
    pub fn once(call_timeout: Duration) -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            call_timeout,
            retry_timeouts: true,
        }
    }

    /// Same policy, but a timed-out attempt is final. Failures reported
    /// before the timeout are still retried.
    pub fn non_idempotent(&self) -> Self {
        Self {
            retry_timeouts: false,
            ..self.clone()
        }
    }

    /// Longest one [`with_retry`] call can take, jitter included.
    pub fn worst_case(&self) -> Duration {
        let attempts = self.max_attempts.max(1);
        let waits: Duration = (1..attempts).map(|a| self.backoff(a)).sum();
        self.call_timeout * attempts + waits + waits.mul_f64(JITTER_FRACTION)
    }

    /// Delay before attempt `attempt + 1` (1-based `attempt`), without jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Run `call` until it succeeds, fails with a non-retryable error, or
/// `policy.max_attempts` is exhausted. Each attempt is cut off after
/// `policy.call_timeout`.
pub async fn with_retry<T, E, F, Fut>(op: &str, policy: &RetryPolicy, mut call: F) -> Result<T, E>
where
    E: RetryableError,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        let result = match timeout(policy.call_timeout, call()).await {
            Ok(r) => r,
            Err(_) => {
                let e = E::timed_out(policy.call_timeout.as_millis() as u64);
                if !policy.retry_timeouts {
                    // The abandoned attempt may still complete.
                    warn!(op, attempt, error = %e, "write timed out, not repeating it");
                    return Err(e);
                }
                Err(e)
            }
        };

        match result {
            Ok(v) => return Ok(v),
            Err(e) if attempt >= attempts || !e.is_retryable() => return Err(e),
            Err(e) => {
                let delay = policy.backoff(attempt);
                let delay = delay + jitter(delay);
                warn!(
                    op,
                    attempt,
                    max = attempts,
                    error = %e,
                    retry_after_ms = delay.as_millis() as u64,
                    "call failed, retrying with backoff"
                );
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Small pseudo-random offset derived from the wall clock's sub-second nanos.
fn jitter(base: Duration) -> Duration {
    let max_jitter_ms = (base.as_millis() as f64 * JITTER_FRACTION) as u64;
    if max_jitter_ms == 0 {
        return Duration::ZERO;
    }
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    Duration::from_millis(nanos as u64 % max_jitter_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, PartialEq)]
    enum TestError {
        Flaky,
        Fatal,
        Timeout(u64),
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{self:?}")
        }
    }

    impl RetryableError for TestError {
        fn timed_out(ms: u64) -> Self {
            TestError::Timeout(ms)
        }

        fn is_retryable(&self) -> bool {
            !matches!(self, TestError::Fatal)
        }
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
            call_timeout: Duration::from_millis(50),
            retry_timeouts: true,
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let p = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(300),
            call_timeout: Duration::from_secs(1),
            retry_timeouts: true,
        };
        assert_eq!(p.backoff(1), Duration::from_millis(100));
        assert_eq!(p.backoff(2), Duration::from_millis(200));
        assert_eq!(p.backoff(3), Duration::from_millis(300));
        assert_eq!(p.backoff(40), Duration::from_millis(300));
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = &AtomicU32::new(0);
        let out: Result<u32, TestError> = with_retry("flaky", &fast_policy(3), move || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(TestError::Flaky)
            } else {
                Ok(n)
            }
        })
        .await;
        assert_eq!(out, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = &AtomicU32::new(0);
        let out: Result<(), TestError> = with_retry("down", &fast_policy(2), move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(TestError::Flaky)
        })
        .await;
        assert_eq!(out, Err(TestError::Flaky));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn fatal_error_is_not_retried() {
        let calls = &AtomicU32::new(0);
        let out: Result<(), TestError> = with_retry("bad", &fast_policy(5), move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(TestError::Fatal)
        })
        .await;
        assert_eq!(out, Err(TestError::Fatal));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stalled_call_times_out() {
        let out: Result<(), TestError> = with_retry("stall", &fast_policy(1), || async {
            sleep(Duration::from_secs(10)).await;
            Ok(())
        })
        .await;
        assert_eq!(out, Err(TestError::Timeout(50)));
    }

    #[tokio::test]
    async fn timed_out_write_is_not_repeated() {
        let calls = &AtomicU32::new(0);
        let policy = fast_policy(3).non_idempotent();
        let out: Result<(), TestError> = with_retry("insert", &policy, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            sleep(Duration::from_secs(10)).await;
            Ok(())
        })
        .await;
        assert_eq!(out, Err(TestError::Timeout(50)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_write_is_still_retried() {
        let calls = &AtomicU32::new(0);
        let policy = fast_policy(3).non_idempotent();
        let out: Result<u32, TestError> = with_retry("insert", &policy, move || async move {
            match calls.fetch_add(1, Ordering::SeqCst) {
                0 => Err(TestError::Flaky),
                n => Ok(n),
            }
        })
        .await;
        assert_eq!(out, Ok(1));
    }

    #[test]
    fn worst_case_covers_every_attempt_and_wait() {
        let p = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
            call_timeout: Duration::from_secs(15),
            retry_timeouts: true,
        };
        // 3 x 15s + (0.5s + 1s) + 10% jitter on the waits.
        assert_eq!(p.worst_case(), Duration::from_millis(46_650));
        assert_eq!(
            RetryPolicy::once(Duration::from_secs(2)).worst_case(),
            Duration::from_secs(2)
        );
    }
}
