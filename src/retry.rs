//! Backoff between model attempts.
//!
//! Two strategies, picked by classifying the error: a provider-hinted wait
//! when a rate-limit reply says how long to back off, and a capped
//! exponential delay for everything else.

use std::time::Duration;

use crate::config::ModelConfig;
use crate::error::ModelError;

/// How long to wait before the next attempt, and why.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Provider-suggested wait plus the configured margin.
    ProviderHinted(Duration),
    Exponential(Duration),
}

impl Backoff {
    pub fn delay(&self) -> Duration {
        match self {
            Backoff::ProviderHinted(d) | Backoff::Exponential(d) => *d,
        }
    }
}

/// Doubling delay starting at `base`, never above `max`.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    next: Duration,
    max: Duration,
}

impl ExponentialBackoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            next: base.min(max),
            max,
        }
    }

    /// Returns the current delay and advances to the next one.
    pub fn next_delay(&mut self) -> Duration {
        let current = self.next;
        self.next = current.saturating_mul(2).min(self.max);
        current
    }
}

/// Retry settings for one model call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub hint_margin: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&ModelConfig::default())
    }
}

impl From<&ModelConfig> for RetryPolicy {
    fn from(config: &ModelConfig) -> Self {
        Self {
            attempts: config.attempts.max(1),
            base_delay: config.base_delay,
            max_delay: config.max_delay,
            hint_margin: config.hint_margin,
        }
    }
}

impl RetryPolicy {
    pub fn exponential(&self) -> ExponentialBackoff {
        ExponentialBackoff::new(self.base_delay, self.max_delay)
    }

    /// Picks the strategy for `error`. The exponential sequence advances
    /// either way so later generic waits keep growing.
    pub fn backoff_for(&self, error: &ModelError, exponential: &mut ExponentialBackoff) -> Backoff {
        let generic = exponential.next_delay();
        match error.retry_after() {
            Some(hint) => Backoff::ProviderHinted(hint + self.hint_margin),
            None => Backoff::Exponential(generic),
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
