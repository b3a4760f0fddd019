use std::time::Duration;

use tokio::sync::watch;

use crate::error::BotError;
use crate::execution::TradingCycle;
use crate::risk::{CircuitBreaker, CircuitBreakerTrip};
use crate::Result;

/// Runs trading cycles back to back, sleeping between them
///
/// A cycle that errors or could not scan entries counts as failed and is
/// followed by an exponential backoff instead of the poll interval. The loop
/// stops when the shutdown flag flips or the circuit breaker trips; a cycle
/// already in progress always finishes first.
pub struct Scheduler {
    cycle: TradingCycle,
    breaker: CircuitBreaker,
    poll_interval: Duration,
}

impl Scheduler {
    pub fn new(cycle: TradingCycle, breaker: CircuitBreaker, poll_interval: Duration) -> Self {
        Self {
            cycle,
            breaker,
            poll_interval,
        }
    }

    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        tracing::info!(
            "⏱️  Polling every {}s with {}",
            self.poll_interval.as_secs(),
            self.cycle.strategy_name()
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let delay = self.run_cycle().await?;
            tracing::info!("⏳ Waiting {}s before next cycle...", delay.as_secs());

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                // A dropped sender also ends the loop
                _ = shutdown.changed() => break,
            }
        }

        tracing::info!("🛑 Trading loop stopped");
        Ok(())
    }

    /// Run one cycle and work out how long to wait before the next
    async fn run_cycle(&mut self) -> Result<Duration> {
        tracing::info!("🔁 Running trading cycle...");

        let healthy = match self.cycle.run_once().await {
            Ok(report) => report.is_healthy(),
            Err(e) => {
                tracing::error!("✗ Trading cycle failed: {}", e);
                false
            }
        };

        if healthy {
            self.breaker.record_success();
            return Ok(self.poll_interval);
        }

        match self.breaker.record_failure() {
            Ok(backoff) => {
                tracing::warn!(
                    "Cycle failed ({} in a row), backing off {}s",
                    self.breaker.consecutive_failures(),
                    backoff.as_secs()
                );
                Ok(backoff)
            }
            Err(CircuitBreakerTrip::ConsecutiveFailures(failures)) => {
                tracing::error!("🚨 CIRCUIT BREAKER TRIPPED after {} failed cycles", failures);
                Err(BotError::Halted { failures })
            }
        }
    }
}
