//! Bounded retry helpers shared by navigation, the pickup filter and the
//! store-context setter.
//!
//! Two shapes are supported: [`retry_with_backoff`] for fallible operations
//! that return `Result`, and [`retry_until`] for attempts that either produce
//! a value or signal "not yet" with `None`.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::error::PageError;

/// Attempt budget plus the exponential delay schedule between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on every further retry.
    pub base_delay: Duration,
    /// Upper bound on random jitter added to each delay.
    pub max_jitter: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_jitter: Duration::ZERO,
        }
    }

    /// A single attempt with no waiting.
    #[must_use]
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    #[must_use]
    pub fn with_jitter(mut self, max_jitter: Duration) -> Self {
        self.max_jitter = max_jitter;
        self
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Sleep before retry number `attempt + 1`: `base * 2^attempt` plus jitter.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(16);
        let base = self.base_delay.saturating_mul(factor);
        base.saturating_add(jitter(self.max_jitter))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

fn jitter(max: Duration) -> Duration {
    if max.is_zero() {
        return Duration::ZERO;
    }
    let max_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
    Duration::from_millis(rand::rng().random_range(0..=max_ms))
}

/// Executes `operation` until it succeeds, fails with a non-retriable error,
/// or the policy's attempt budget is spent. The last error is returned.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, PageError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, PageError>>,
{
    let max_attempts = policy.attempts();
    let mut attempt = 0u32;

    loop {
        let err = match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if !err.is_retriable() || attempt + 1 >= max_attempts {
            return Err(err);
        }

        let delay = policy.delay_for(attempt);
        tracing::warn!(
            attempt,
            max_attempts,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "transient page error, retrying after backoff"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

/// Runs `attempt_fn` until it yields `Some`, or returns `None` once the
/// attempt budget is spent. Sleeps between attempts like
/// [`retry_with_backoff`].
pub async fn retry_until<T, F, Fut>(policy: &RetryPolicy, mut attempt_fn: F) -> Option<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let max_attempts = policy.attempts();
    for attempt in 0..max_attempts {
        if let Some(value) = attempt_fn(attempt).await {
            return Some(value);
        }
        if attempt + 1 < max_attempts {
            let delay = policy.delay_for(attempt);
            tracing::debug!(attempt, max_attempts, "attempt unsuccessful, retrying");
            tokio::time::sleep(delay).await;
        }
    }
    None
}
