//! Retry policy with bounded exponential backoff.
//!
//! The policy counts attempts, not retries: `max_attempts = 3` means one initial try and
//! at most two retries. The delay before attempt `n + 1` is
//! `min(initial_backoff * backoff_factor^(n - 1), max_backoff)`; no delay follows the
//! final attempt.
//!
//! # Example
//!
//! ```rust
//! use ticketchain_runtime::retry::RetryPolicy;
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::builder()
//!     .max_attempts(5)
//!     .initial_backoff(Duration::from_millis(100))
//!     .max_backoff(Duration::from_secs(10))
//!     .backoff_factor(2.0)
//!     .build();
//!
//! assert_eq!(policy.backoff_after(1), Duration::from_millis(100));
//! assert_eq!(policy.backoff_after(3), Duration::from_millis(400));
//! ```

use std::time::Duration;

/// Retry policy configuration for exponential backoff.
///
/// # Default Values
///
/// - `max_attempts`: 3
/// - `initial_backoff`: 1 second
/// - `max_backoff`: 10 seconds
/// - `backoff_factor`: 2.0 (delay doubles each retry)
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_backoff: Duration,
    /// Cap on any single delay
    pub max_backoff: Duration,
    /// Growth factor between consecutive delays
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1000),
            max_backoff: Duration::from_millis(10_000),
            backoff_factor: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Create a new policy builder.
    #[must_use]
    pub const fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder {
            max_attempts: None,
            initial_backoff: None,
            max_backoff: None,
            backoff_factor: None,
        }
    }

    /// Delay to wait after failed attempt `attempt` (1-based) before the next one.
    ///
    /// `initial_backoff * backoff_factor^(attempt - 1)`, capped at `max_backoff`.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss,
        clippy::cast_possible_wrap
    )]
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let delay_ms = self.initial_backoff.as_millis() as f64 * self.backoff_factor.powi(exponent);
        let cap_ms = self.max_backoff.as_millis() as f64;

        if !delay_ms.is_finite() || delay_ms >= cap_ms {
            self.max_backoff
        } else {
            Duration::from_millis(delay_ms.max(0.0) as u64)
        }
    }

    /// Whether `attempt` (1-based) is the last one the policy allows.
    #[must_use]
    pub const fn is_final(&self, attempt: u32) -> bool {
        attempt >= self.max_attempts
    }
}

/// Builder for [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryPolicyBuilder {
    max_attempts: Option<u32>,
    initial_backoff: Option<Duration>,
    max_backoff: Option<Duration>,
    backoff_factor: Option<f64>,
}

impl RetryPolicyBuilder {
    /// Set maximum number of attempts (at least 1).
    #[must_use]
    pub const fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Set delay before the second attempt.
    #[must_use]
    pub const fn initial_backoff(mut self, delay: Duration) -> Self {
        self.initial_backoff = Some(delay);
        self
    }

    /// Set maximum delay (cap for exponential backoff).
    #[must_use]
    pub const fn max_backoff(mut self, delay: Duration) -> Self {
        self.max_backoff = Some(delay);
        self
    }

    /// Set growth factor for exponential backoff.
    #[must_use]
    pub const fn backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = Some(factor);
        self
    }

    /// Build the [`RetryPolicy`].
    #[must_use]
    pub fn build(self) -> RetryPolicy {
        let defaults = RetryPolicy::default();
        RetryPolicy {
            max_attempts: self.max_attempts.unwrap_or(defaults.max_attempts).max(1),
            initial_backoff: self.initial_backoff.unwrap_or(defaults.initial_backoff),
            max_backoff: self.max_backoff.unwrap_or(defaults.max_backoff),
            backoff_factor: self.backoff_factor.unwrap_or(defaults.backoff_factor),
        }
    }
}

/// Progress of one logical operation through its attempts.
///
/// Never mutated in place: each failed attempt produces the next record via
/// [`AttemptState::next`], carrying the error that ended it and the delay before the
/// next try.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptState<E> {
    attempt: u32,
    backoff: Duration,
    last_error: Option<E>,
}

impl<E> AttemptState<E> {
    /// State before the first attempt.
    #[must_use]
    pub const fn first() -> Self {
        Self {
            attempt: 1,
            backoff: Duration::ZERO,
            last_error: None,
        }
    }

    /// Current attempt number, 1-based
    #[must_use]
    pub const fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Delay to wait before the current attempt
    #[must_use]
    pub const fn backoff(&self) -> Duration {
        self.backoff
    }

    /// Error of the previous attempt
    #[must_use]
    pub const fn last_error(&self) -> Option<&E> {
        self.last_error.as_ref()
    }

    /// Record that the current attempt failed with `error`; the next waits `backoff`.
    #[must_use]
    pub fn next(self, error: E, backoff: Duration) -> Self {
        Self {
            attempt: self.attempt.saturating_add(1),
            backoff,
            last_error: Some(error),
        }
    }
}
