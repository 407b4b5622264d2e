//! Retry policy and backoff executor.

use genui_core::errors::{GenUiError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Retry decision policy.
///
/// The policy is pure: given an error and the attempt count it
/// answers should-retry and delay-for-attempt. Delays grow linearly
/// in the attempt number, `initial_delay * (backoff_multiplier *
/// attempt)` capped at `max_delay`, so the first retry waits zero.
/// Callers that want jitter layer it with [`with_jitter`].
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts allowed, including the first.
    pub max_attempts: u32,
    /// Base delay unit.
    pub initial_delay: Duration,
    /// Hard cap on any single delay.
    pub max_delay: Duration,
    /// Linear growth factor per attempt.
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Create the default policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the attempt budget.
    #[must_use]
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    /// Set the base delay.
    #[must_use]
    pub fn initial_delay(mut self, d: Duration) -> Self {
        self.initial_delay = d;
        self
    }

    /// Set the delay cap.
    #[must_use]
    pub fn max_delay(mut self, d: Duration) -> Self {
        self.max_delay = d;
        self
    }

    /// Set the growth factor.
    #[must_use]
    pub fn backoff_multiplier(mut self, m: f64) -> Self {
        self.backoff_multiplier = m;
        self
    }

    /// A policy that never retries.
    #[must_use]
    pub fn no_retry() -> Self {
        Self::default().max_attempts(1)
    }

    /// Whether another attempt may follow this error.
    ///
    /// `attempts_so_far` counts completed attempts; once it reaches
    /// `max_attempts` the answer is always no. Otherwise the error's
    /// own classification decides.
    #[must_use]
    pub fn should_retry(&self, error: &GenUiError, attempts_so_far: u32) -> bool {
        if attempts_so_far >= self.max_attempts {
            return false;
        }
        error.is_retryable()
    }

    /// Delay before the retry with the given zero-based index.
    ///
    /// `delay_for_attempt(0)` is zero by construction: the first
    /// retry goes out immediately.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let scaled = self
            .initial_delay
            .mul_f64(self.backoff_multiplier * f64::from(attempt));
        scaled.min(self.max_delay)
    }
}

/// Apply proportional random jitter to a delay.
///
/// `jitter` is a fraction of the delay (0.1 = ±10%). The policy
/// itself stays deterministic; this is for callers that want spread.
#[must_use]
pub fn with_jitter(delay: Duration, jitter: f64) -> Duration {
    if jitter <= 0.0 || delay.is_zero() {
        return delay;
    }
    use rand::Rng;
    let factor: f64 = rand::thread_rng().gen_range(-1.0..1.0);
    let offset = delay.as_secs_f64() * jitter * factor;
    Duration::from_secs_f64((delay.as_secs_f64() + offset).max(0.0))
}

/// Run an operation under a retry policy.
///
/// On a non-retryable error or an exhausted attempt budget the last
/// error is returned as-is.
pub async fn retry_with_backoff<F, Fut, T>(policy: &RetryPolicy, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                if !policy.should_retry(&error, attempts) {
                    warn!(
                        attempts,
                        error = %error,
                        "retry budget exhausted or error not retryable"
                    );
                    return Err(error);
                }
                let delay = policy.delay_for_attempt(attempts - 1);
                debug!(attempts, delay_ms = delay.as_millis() as u64, "retrying after delay");
                sleep(delay).await;
            }
        }
    }
}
