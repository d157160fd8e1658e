//! Retry policy for remote calls.
//!
//! The production policy retries forever with exponential backoff: a call
//! made under it either eventually returns a terminal result or never
//! returns. Tests substitute a bounded policy so failures become
//! observable. The policy itself is pure — it only computes delays; the
//! remote client drives the attempts and sleeps.

use std::time::Duration;

/// Maximum jitter added to each backoff delay.
const MAX_JITTER_MS: u64 = 1000;

/// Exponential-backoff retry policy.
///
/// Delays double per attempt from `initial_delay` up to `max_delay`, plus
/// random jitter to prevent thundering herd when many devices retry after
/// a service outage.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts; `None` retries forever.
    max_attempts: Option<u32>,
    /// Delay before the first retry.
    initial_delay: Duration,
    /// Cap on the computed backoff (before jitter).
    max_delay: Duration,
    /// Whether to add random jitter.
    use_jitter: bool,
}

impl RetryPolicy {
    /// The production policy: retry forever with exponential backoff.
    pub fn forever() -> Self {
        Self {
            max_attempts: None,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(64),
            use_jitter: true,
        }
    }

    /// A bounded policy for tests: give up after `max_attempts` attempts
    /// (including the first).
    pub fn limited(max_attempts: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts),
            ..Self::forever()
        }
    }

    /// Set the delay before the first retry.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the cap on the computed backoff.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Disable jitter, for deterministic tests.
    pub fn without_jitter(mut self) -> Self {
        self.use_jitter = false;
        self
    }

    /// Whether `attempt` failures mean the policy is out of attempts.
    ///
    /// Always false for the unbounded production policy.
    pub fn is_exhausted(&self, attempt: u32) -> bool {
        match self.max_attempts {
            Some(max) => attempt >= max,
            None => false,
        }
    }

    /// Delay to sleep before retry number `attempt` (1-based).
    ///
    /// Formula: `min(max_delay, initial_delay * 2^(attempt-1))` plus
    /// 0..=1000ms random jitter.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let exponent = attempt.saturating_sub(1).min(32);
        let base_ms = (self.initial_delay.as_millis() as u64)
            .saturating_mul(1u64 << exponent)
            .min(self.max_delay.as_millis() as u64);
        let base = Duration::from_millis(base_ms);

        if self.use_jitter {
            base + Duration::from_millis(random_jitter_ms())
        } else {
            base
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::forever()
    }
}

/// Generate random jitter between 0 and [`MAX_JITTER_MS`] milliseconds.
fn random_jitter_ms() -> u64 {
    let mut bytes = [0u8; 8];
    getrandom::getrandom(&mut bytes).expect("getrandom failed");
    u64::from_le_bytes(bytes) % (MAX_JITTER_MS + 1)
}
