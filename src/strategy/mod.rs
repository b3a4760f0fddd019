// Trading strategy module
pub mod confluence;
pub mod rsi_reversal;
pub mod signals;

use crate::config::{BotConfig, StrategyKind};
use crate::models::{Candle, Signal};
use crate::Result;

pub use confluence::ConfluenceStrategy;
pub use rsi_reversal::RsiReversalStrategy;
pub use signals::{ExitReason, ExitRule, SignalConfig};

/// Base trait for entry strategies
pub trait Strategy: Send + Sync {
    /// Generate an entry signal from candles ordered oldest first
    fn generate_signal(&self, candles: &[Candle]) -> Result<Signal>;

    /// Get strategy name
    fn name(&self) -> &str;

    /// Minimum candles required for this strategy
    fn min_candles_required(&self) -> usize;
}

/// Build the strategy selected in the configuration
pub fn from_config(config: &BotConfig) -> Box<dyn Strategy> {
    let signal_config = SignalConfig::from(config);
    match config.strategy {
        StrategyKind::Simple => Box::new(RsiReversalStrategy::new(signal_config)),
        StrategyKind::Extended => Box::new(ConfluenceStrategy::new(signal_config)),
    }
}
