use super::{
    signals::{rsi_entry, SignalConfig},
    Strategy,
};
use crate::error::BotError;
use crate::indicators::IndicatorSnapshot;
use crate::models::{Candle, Signal};
use crate::Result;

/// Oversold mean-reversion entry on RSI alone
#[derive(Debug, Clone, Default)]
pub struct RsiReversalStrategy {
    config: SignalConfig,
}

impl RsiReversalStrategy {
    pub fn new(config: SignalConfig) -> Self {
        Self { config }
    }
}

impl Strategy for RsiReversalStrategy {
    fn generate_signal(&self, candles: &[Candle]) -> Result<Signal> {
        let insufficient = || BotError::InsufficientData {
            have: candles.len(),
            need: self.min_candles_required(),
        };

        if candles.len() < self.min_candles_required() {
            return Err(insufficient());
        }

        let snapshot = IndicatorSnapshot::from_candles(candles, &self.config.params)
            .ok_or_else(insufficient)?;

        rsi_entry(&snapshot, &self.config).ok_or_else(insufficient)
    }

    fn name(&self) -> &str {
        "RsiReversalStrategy"
    }

    fn min_candles_required(&self) -> usize {
        self.config.params.rsi_period + 1
    }
}
