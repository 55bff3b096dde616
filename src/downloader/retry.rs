//! Bounded retry policies shared by the job poller and artifact downloader
//!
//! A [`RetryPolicy`] is a pure mapping from a 1-based attempt number to the
//! wait that follows that attempt, paired with a maximum attempt count.

use std::time::Duration;

/// How the wait after each attempt grows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Retry immediately
    None,
    /// Fixed wait after every attempt
    Fixed {
        /// Wait in base units
        units: u64,
    },
    /// `min(step * attempt, cap)` base units
    Linear {
        /// Growth per attempt in base units
        step: u64,
        /// Upper bound in base units
        cap: u64,
    },
}

/// Bounded retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
    unit: Duration,
}

impl RetryPolicy {
    /// Create a policy measured in seconds
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts,
            backoff,
            unit: Duration::from_secs(1),
        }
    }

    /// Policy that retries with no wait between attempts
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Backoff::None)
    }

    /// Policy with `min(step * attempt, cap)` second waits
    pub fn linear(max_attempts: u32, step: u64, cap: u64) -> Self {
        Self::new(max_attempts, Backoff::Linear { step, cap })
    }

    /// Replace the base time unit (seconds by default)
    ///
    /// Tests shrink the unit to milliseconds so full attempt budgets run
    /// quickly while keeping the same shape.
    pub fn with_unit(mut self, unit: Duration) -> Self {
        self.unit = unit;
        self
    }

    /// Replace the attempt budget
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Maximum number of attempts
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Base time unit
    pub fn unit(&self) -> Duration {
        self.unit
    }

    /// Wait following attempt `attempt` (1-based), in base units
    pub fn delay_units(&self, attempt: u32) -> u64 {
        match self.backoff {
            Backoff::None => 0,
            Backoff::Fixed { units } => units,
            Backoff::Linear { step, cap } => step.saturating_mul(u64::from(attempt)).min(cap),
        }
    }

    /// Wait following attempt `attempt` (1-based)
    pub fn delay(&self, attempt: u32) -> Duration {
        let units = u32::try_from(self.delay_units(attempt)).unwrap_or(u32::MAX);
        self.unit.saturating_mul(units)
    }

    /// Iterate over attempt numbers `1..=max_attempts`
    pub fn attempts(&self) -> impl Iterator<Item = u32> {
        1..=self.max_attempts
    }

    /// Whether another attempt follows `attempt`
    pub fn has_next(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}
