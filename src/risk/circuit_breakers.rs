use std::time::Duration;

use crate::config::BotConfig;

/// Halts the bot after repeated failed cycles and backs off in between
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    pub max_consecutive_failures: u32,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
    consecutive_failures: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CircuitBreakerTrip {
    ConsecutiveFailures(u32),
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(30), Duration::from_secs(1800))
    }
}

impl CircuitBreaker {
    pub fn new(max_consecutive_failures: u32, backoff_base: Duration, backoff_max: Duration) -> Self {
        Self {
            max_consecutive_failures,
            backoff_base,
            backoff_max,
            consecutive_failures: 0,
        }
    }

    pub fn from_config(config: &BotConfig) -> Self {
        Self::new(
            config.max_consecutive_failures,
            Duration::from_secs(config.backoff_base_secs),
            Duration::from_secs(config.backoff_max_secs),
        )
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn record_success(&mut self) {
        if self.consecutive_failures > 0 {
            tracing::info!(
                "Recovered after {} failed cycle(s)",
                self.consecutive_failures
            );
        }
        self.consecutive_failures = 0;
    }

    /// Record a failed cycle
    ///
    /// Returns the delay before the next attempt, or the trip once the
    /// failure limit is reached.
    pub fn record_failure(&mut self) -> Result<Duration, CircuitBreakerTrip> {
        self.consecutive_failures += 1;

        if self.consecutive_failures >= self.max_consecutive_failures {
            return Err(CircuitBreakerTrip::ConsecutiveFailures(
                self.consecutive_failures,
            ));
        }

        Ok(self.backoff_delay())
    }

    /// base * 2^(failures - 1), capped at backoff_max
    fn backoff_delay(&self) -> Duration {
        let exponent = self.consecutive_failures.saturating_sub(1).min(31);
        self.backoff_base
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.backoff_max)
            .min(self.backoff_max)
    }
}
