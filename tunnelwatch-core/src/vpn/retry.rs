//! Retry countdown with exponential backoff
//!
//! `RetryScheduler` is the countdown shown to the user after a retryable
//! fault. It does not own a timer: the connection monitor ticks it once per
//! second, which keeps it deterministic and lets the state machine cancel
//! it synchronously whenever the connection leaves the error state.
//!
//! `RetryPolicy` decides how long each countdown lasts.

use serde::{Deserialize, Serialize};

/// Countdown progress exposed to observers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryInfo {
    /// Length of the current countdown
    pub timeout_seconds: u32,

    /// Seconds left until the next reconnection attempt
    pub retry_in_seconds: u32,
}

/// Outcome of a single countdown tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryTick {
    /// Still counting down
    Pending(RetryInfo),

    /// The countdown reached zero; emitted once per `start`
    Expired,
}

/// Single countdown, restarted for every retryable fault
#[derive(Debug, Default)]
pub struct RetryScheduler {
    current: Option<RetryInfo>,
    generation: u64,
}

impl RetryScheduler {
    /// Create an inert scheduler
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a countdown, replacing any active one
    pub fn start(&mut self, timeout_seconds: u32) -> RetryInfo {
        let info = RetryInfo {
            timeout_seconds,
            retry_in_seconds: timeout_seconds,
        };
        self.current = Some(info);
        self.generation += 1;
        info
    }

    /// Advance the countdown by one second
    ///
    /// Returns `None` when no countdown is active.
    pub fn tick(&mut self) -> Option<RetryTick> {
        let info = self.current.as_mut()?;

        if info.retry_in_seconds <= 1 {
            self.current = None;
            return Some(RetryTick::Expired);
        }

        info.retry_in_seconds -= 1;
        Some(RetryTick::Pending(*info))
    }

    /// Stop the countdown; returns whether one was active
    pub fn cancel(&mut self) -> bool {
        self.current.take().is_some()
    }

    /// Current countdown progress
    pub fn info(&self) -> Option<RetryInfo> {
        self.current
    }

    /// Whether a countdown is running
    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }

    /// Incremented by every `start`
    ///
    /// Lets the owner of the tick timer notice a restarted countdown and
    /// realign the timer with it.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Configuration for countdown lengths between automatic attempts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Countdown length in seconds before the first automatic attempt
    #[serde(default = "default_base_timeout")]
    pub base_timeout_secs: u32,

    /// Multiplier applied per consecutive attempt
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: u32,

    /// Cap for the countdown length
    #[serde(default = "default_max_timeout")]
    pub max_timeout_secs: u32,

    /// Number of automatic attempts before the client stops retrying
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_base_timeout() -> u32 {
    5
}
fn default_backoff_multiplier() -> u32 {
    2
}
fn default_max_timeout() -> u32 {
    60
}
fn default_max_attempts() -> u32 {
    5
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_timeout_secs: default_base_timeout(),
            backoff_multiplier: default_backoff_multiplier(),
            max_timeout_secs: default_max_timeout(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl RetryPolicy {
    /// Validate the entire policy
    ///
    /// # Returns
    ///
    /// * `Ok(())` if all fields are valid
    /// * `Err(PolicyValidationError)` with the first validation error encountered
    pub fn validate(&self) -> Result<(), PolicyValidationError> {
        if self.base_timeout_secs < 1 || self.base_timeout_secs > 300 {
            return Err(PolicyValidationError::InvalidBaseTimeout(
                self.base_timeout_secs,
            ));
        }

        if self.backoff_multiplier < 1 || self.backoff_multiplier > 10 {
            return Err(PolicyValidationError::InvalidBackoffMultiplier(
                self.backoff_multiplier,
            ));
        }

        if self.max_timeout_secs < self.base_timeout_secs {
            return Err(PolicyValidationError::MaxTimeoutLessThanBase(
                self.max_timeout_secs,
                self.base_timeout_secs,
            ));
        }

        if self.max_attempts < 1 || self.max_attempts > 20 {
            return Err(PolicyValidationError::InvalidMaxAttempts(self.max_attempts));
        }

        Ok(())
    }

    /// Countdown length for a given attempt (1-indexed)
    ///
    /// Formula: base × multiplier^(attempt-1), capped at max_timeout_secs
    pub fn timeout_for_attempt(&self, attempt: u32) -> u32 {
        let exponent = attempt.saturating_sub(1);
        let factor = self
            .backoff_multiplier
            .checked_pow(exponent)
            .unwrap_or(u32::MAX);

        self.base_timeout_secs
            .saturating_mul(factor)
            .min(self.max_timeout_secs)
    }
}

/// Validation errors for RetryPolicy
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PolicyValidationError {
    #[error("base_timeout_secs must be between 1 and 300, got: {0}")]
    InvalidBaseTimeout(u32),

    #[error("backoff_multiplier must be between 1 and 10, got: {0}")]
    InvalidBackoffMultiplier(u32),

    #[error("max_timeout_secs ({0}) must be >= base_timeout_secs ({1})")]
    MaxTimeoutLessThanBase(u32, u32),

    #[error("max_attempts must be between 1 and 20, got: {0}")]
    InvalidMaxAttempts(u32),
}
