//! Retry policy configuration
//!
//! A `RetryPolicy` is plain, immutable data. The executor that interprets it
//! lives in `stowage-infra`.

use std::time::Duration;

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);
const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// How many times an operation is attempted and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    backoff_multiplier: f64,
}

impl RetryPolicy {
    /// Create a policy, rejecting values the executor cannot honor.
    pub fn new(
        max_attempts: u32,
        base_delay: Duration,
        backoff_multiplier: f64,
    ) -> Result<Self, anyhow::Error> {
        let policy = Self {
            max_attempts,
            base_delay,
            backoff_multiplier,
        };
        policy.validate()?;
        Ok(policy)
    }

    pub fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder::default()
    }

    /// Retry policy for fast operations: 5 attempts starting at 100ms, x1.5
    pub fn fast() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            backoff_multiplier: 1.5,
        }
    }

    /// Retry policy for slow operations: 3 attempts starting at 5s, x3.0
    pub fn slow() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(5),
            backoff_multiplier: 3.0,
        }
    }

    /// Constant delay between attempts (no backoff).
    ///
    /// Zero attempts or a zero delay are clamped to 1 attempt / 1ms.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: delay.max(Duration::from_millis(1)),
            backoff_multiplier: 1.0,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    pub fn backoff_multiplier(&self) -> f64 {
        self.backoff_multiplier
    }

    /// Un-jittered delay after the given zero-based attempt:
    /// `base_delay * backoff_multiplier^attempt`.
    pub fn nominal_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.base_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.max_attempts == 0 {
            return Err(anyhow::anyhow!("max_attempts must be at least 1"));
        }

        if self.base_delay.is_zero() {
            return Err(anyhow::anyhow!("base_delay must be positive"));
        }

        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(anyhow::anyhow!(
                "backoff_multiplier must be a finite value >= 1.0, got {}",
                self.backoff_multiplier
            ));
        }

        Ok(())
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}

/// Builder starting from the default policy.
#[derive(Debug, Clone, Default)]
pub struct RetryPolicyBuilder {
    policy: RetryPolicy,
}

impl RetryPolicyBuilder {
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.policy.max_attempts = max_attempts;
        self
    }

    pub fn base_delay(mut self, base_delay: Duration) -> Self {
        self.policy.base_delay = base_delay;
        self
    }

    pub fn backoff_multiplier(mut self, backoff_multiplier: f64) -> Self {
        self.policy.backoff_multiplier = backoff_multiplier;
        self
    }

    pub fn build(self) -> Result<RetryPolicy, anyhow::Error> {
        self.policy.validate()?;
        Ok(self.policy)
    }
}
