//! Retry policy with exponential backoff and full jitter.

use rand::Rng;
use std::time::Duration;

use crate::config::Config;

/// Parameters for exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum retry attempts after the initial request
    pub max_retries: u32,
    /// Base delay before the first retry
    pub base_delay: Duration,
    /// Ceiling for any single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(16),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_secs_f64(config.base_retry_delay.max(0.0)),
            max_delay: Duration::from_secs_f64(config.max_retry_delay.max(0.0)),
        }
    }

    /// Delay before retry number `attempt` (0-based).
    ///
    /// Full jitter: uniform over `[0, min(base * 2^attempt, max)]`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp =
            self.base_delay.as_secs_f64() * f64::from(2u32.saturating_pow(attempt.min(16)));
        let cap = exp.min(self.max_delay.as_secs_f64());
        if cap <= 0.0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(rand::thread_rng().gen_range(0.0..=cap))
    }
}
