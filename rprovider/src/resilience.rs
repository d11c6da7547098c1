//! Retry/backoff policy for model calls and the operation hook contract.

use std::future::Future;
use std::time::Duration;

use crate::{ProviderError, ProviderId};

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// A single attempt, no retries.
    pub fn disabled() -> Self {
        Self::new(1)
    }

    pub fn should_retry(&self, attempt: u32, error: &ProviderError) -> bool {
        error.retryable && attempt < self.max_attempts
    }

    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let unbounded = self.initial_backoff.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        Duration::from_secs_f64(unbounded.min(self.max_backoff.as_secs_f64()))
    }
}

pub trait ProviderOperationHooks: Send + Sync {
    fn on_attempt_start(&self, _provider: ProviderId, _operation: &str, _attempt: u32) {}

    fn on_retry_scheduled(
        &self,
        _provider: ProviderId,
        _operation: &str,
        _attempt: u32,
        _delay: Duration,
        _error: &ProviderError,
    ) {
    }

    fn on_success(&self, _provider: ProviderId, _operation: &str, _attempts: u32) {}

    fn on_failure(
        &self,
        _provider: ProviderId,
        _operation: &str,
        _attempts: u32,
        _error: &ProviderError,
    ) {
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopOperationHooks;

impl ProviderOperationHooks for NoopOperationHooks {}

/// Runs `execute` until it succeeds, fails with a non-retryable error, or the
/// policy's attempt budget is spent. `sleep` is injected so callers pick the
/// timer (tokio in production, a recorder in tests).
pub async fn execute_with_retry<T, Op, OpFuture, Sleep, SleepFuture>(
    provider: ProviderId,
    operation: &str,
    policy: &RetryPolicy,
    hooks: &dyn ProviderOperationHooks,
    mut execute: Op,
    mut sleep: Sleep,
) -> Result<T, ProviderError>
where
    Op: FnMut(u32) -> OpFuture,
    OpFuture: Future<Output = Result<T, ProviderError>>,
    Sleep: FnMut(Duration) -> SleepFuture,
    SleepFuture: Future<Output = ()>,
{
    let mut attempt = 1;

    loop {
        hooks.on_attempt_start(provider, operation, attempt);

        let error = match execute(attempt).await {
            Ok(value) => {
                hooks.on_success(provider, operation, attempt);
                return Ok(value);
            }
            Err(error) => error,
        };

        if !policy.should_retry(attempt, &error) {
            hooks.on_failure(provider, operation, attempt, &error);
            return Err(error);
        }

        let delay = policy.backoff_for_attempt(attempt);
        hooks.on_retry_scheduled(provider, operation, attempt, delay, &error);
        sleep(delay).await;
        attempt += 1;
    }
}
