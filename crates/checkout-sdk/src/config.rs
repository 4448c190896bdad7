//! SDK Configuration

use std::time::Duration;

use checkout_core::DEFAULT_MAX_RECURSION_DEPTH;

use crate::error::{Result, SdkError};

/// Poll worker backoff settings
#[derive(Clone, Debug)]
pub struct PollConfig {
    /// Delay before the second attempt (the first is immediate)
    pub initial_delay: Duration,

    /// Factor applied to the delay after every attempt
    pub multiplier: f64,

    /// Upper bound for a single delay
    pub max_delay: Duration,

    /// Attempts before the worker gives up
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(1000),
            multiplier: 1.5,
            max_delay: Duration::from_secs(15),
            max_attempts: 40,
        }
    }
}

impl PollConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let initial_delay = std::env::var("CHECKOUT_POLL_INITIAL_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map_or(defaults.initial_delay, Duration::from_millis);
        let multiplier = std::env::var("CHECKOUT_POLL_MULTIPLIER")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|m: &f64| m.is_finite() && *m >= 1.0)
            .unwrap_or(defaults.multiplier);
        let max_attempts = std::env::var("CHECKOUT_POLL_MAX_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_attempts);

        Self {
            initial_delay,
            multiplier,
            max_attempts,
            ..defaults
        }
    }

    /// Reject settings the backoff cannot honor
    pub fn validate(&self) -> Result<()> {
        if !(self.multiplier.is_finite() && self.multiplier >= 1.0) {
            return Err(SdkError::InvalidState(format!(
                "poll multiplier must be a finite number >= 1.0, got {}",
                self.multiplier
            )));
        }
        if self.max_delay.is_zero() {
            return Err(SdkError::InvalidState("poll max_delay must be positive".into()));
        }
        Ok(())
    }

    /// Multiplier actually applied; invalid values poll at a constant rate
    pub(crate) fn effective_multiplier(&self) -> f64 {
        if self.multiplier.is_finite() && self.multiplier >= 1.0 {
            self.multiplier
        } else {
            1.0
        }
    }
}

/// SDK configuration
#[derive(Clone, Debug)]
pub struct SdkConfig {
    pub poll: PollConfig,

    /// Depth ceiling of the behavior tree runner
    pub max_recursion_depth: usize,

    /// Update passes one world change may trigger before giving up
    pub max_update_passes: usize,

    /// Capacity of the merchant event channel
    pub event_capacity: usize,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            poll: PollConfig::default(),
            max_recursion_depth: DEFAULT_MAX_RECURSION_DEPTH,
            max_update_passes: 32,
            event_capacity: 64,
        }
    }
}

impl SdkConfig {
    pub fn from_env() -> Self {
        Self {
            poll: PollConfig::from_env(),
            ..Default::default()
        }
    }

    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_update_passes == 0 {
            return Err(SdkError::InvalidState("max_update_passes must be positive".into()));
        }
        self.poll.validate()
    }
}
