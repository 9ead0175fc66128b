//! Resilient operation executor
//!
//! Runs a fallible async operation up to `max_attempts` times, waiting an
//! exponentially growing, jittered delay between attempts. Waits race against
//! a [`CancellationToken`] (and, for [`RetryExecutor::execute_with_timeout`],
//! a deadline); whichever fires first ends the execution.

pub mod classify;
mod outcome;

pub use classify::{is_network_error, is_retryable_error, is_temporary_error, is_timeout_error};
pub use outcome::{CancelReason, RetryError, RetryOutcome};

use std::fmt::Display;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use stowage_core::RetryPolicy;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Jitter applied to each delay, as a fraction of the nominal delay (±25%).
pub const JITTER_FRACTION: f64 = 0.25;

/// Executes operations under a [`RetryPolicy`].
///
/// Each executor owns its random source; the lock is held only while a
/// jitter sample is drawn, never across an await.
#[derive(Debug)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    rng: Mutex<StdRng>,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Executor with a deterministic jitter sequence.
    pub fn with_seed(policy: RetryPolicy, seed: u64) -> Self {
        Self {
            policy,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `operation` with a constant delay between attempts.
    pub async fn retry_fixed<T, E, F, Fut>(
        operation: F,
        token: &CancellationToken,
        max_attempts: u32,
        delay: Duration,
    ) -> RetryOutcome<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        Self::new(RetryPolicy::fixed(max_attempts, delay))
            .execute(operation, token)
            .await
    }

    /// Delay to wait after the given zero-based attempt failed:
    /// `base * multiplier^attempt`, jittered uniformly by ±[`JITTER_FRACTION`],
    /// never below `base`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.policy.base_delay();
        let nominal = self.policy.nominal_delay(attempt).as_secs_f64();

        let factor: f64 = {
            let mut rng = self
                .rng
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            rng.random_range(-1.0..=1.0)
        };

        let jittered = nominal + nominal * JITTER_FRACTION * factor;
        Duration::try_from_secs_f64(jittered)
            .unwrap_or(Duration::MAX)
            .max(base)
    }

    /// Run `operation` until it succeeds, the attempts are exhausted, or
    /// `token` is cancelled.
    ///
    /// Cancellation is observed before every attempt and during every wait;
    /// an attempt already in flight is allowed to finish.
    pub async fn execute<T, E, F, Fut>(
        &self,
        operation: F,
        token: &CancellationToken,
    ) -> RetryOutcome<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.run(operation, token, None).await
    }

    /// Like [`execute`](Self::execute), bounded by `timeout` from now.
    ///
    /// The deadline also bounds an in-flight attempt; expiry is reported as
    /// [`CancelReason::DeadlineExceeded`].
    pub async fn execute_with_timeout<T, E, F, Fut>(
        &self,
        operation: F,
        token: &CancellationToken,
        timeout: Duration,
    ) -> RetryOutcome<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let deadline = Instant::now().checked_add(timeout);
        self.run(operation, token, deadline).await
    }

    async fn run<T, E, F, Fut>(
        &self,
        mut operation: F,
        token: &CancellationToken,
        deadline: Option<Instant>,
    ) -> RetryOutcome<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let start = Instant::now();
        let max_attempts = self.policy.max_attempts();
        let mut total_delay = Duration::ZERO;

        let stop = |reason: CancelReason, attempts_used: u32, total_delay: Duration| {
            tracing::info!(
                reason = %reason,
                attempts_used = attempts_used,
                "Retry execution cancelled"
            );
            RetryOutcome {
                result: Err(RetryError::Cancelled(reason)),
                attempts_used,
                elapsed: start.elapsed(),
                total_delay,
            }
        };

        for attempt in 0..max_attempts {
            if token.is_cancelled() {
                return stop(CancelReason::Cancelled, attempt, total_delay);
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return stop(CancelReason::DeadlineExceeded, attempt, total_delay);
            }

            let result = match deadline {
                Some(d) => match tokio::time::timeout_at(d, operation()).await {
                    Ok(result) => result,
                    Err(_) => {
                        return stop(CancelReason::DeadlineExceeded, attempt + 1, total_delay)
                    }
                },
                None => operation().await,
            };

            let error = match result {
                Ok(value) => {
                    return RetryOutcome {
                        result: Ok(value),
                        attempts_used: attempt + 1,
                        elapsed: start.elapsed(),
                        total_delay,
                    };
                }
                Err(e) => e,
            };

            if attempt + 1 == max_attempts {
                let elapsed = start.elapsed();
                tracing::warn!(
                    attempts = max_attempts,
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %error,
                    "Operation failed after all retry attempts"
                );
                return RetryOutcome {
                    result: Err(RetryError::Operation(error)),
                    attempts_used: max_attempts,
                    elapsed,
                    total_delay,
                };
            }

            let delay = self.delay_for_attempt(attempt);
            total_delay = total_delay.saturating_add(delay);

            tracing::debug!(
                attempt = attempt + 1,
                max_attempts = max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Attempt failed, retrying"
            );

            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    return stop(CancelReason::Cancelled, attempt + 1, total_delay);
                }
                _ = wait_for_deadline(deadline) => {
                    return stop(CancelReason::DeadlineExceeded, attempt + 1, total_delay);
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }

        // Only reachable with zero attempts, which RetryPolicy rules out.
        stop(CancelReason::Cancelled, 0, total_delay)
    }
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

async fn wait_for_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
