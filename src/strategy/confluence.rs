use super::{
    signals::{confluence_entry, SignalConfig},
    Strategy,
};
use crate::error::BotError;
use crate::indicators::IndicatorSnapshot;
use crate::models::{Candle, Signal};
use crate::Result;

/// Oversold entry with trend and volume confirmation
///
/// This strategy buys when:
/// - RSI is below the oversold threshold
/// - The MACD line is above its signal line
/// - The latest volume exceeds a multiple of the rolling average
#[derive(Debug, Clone, Default)]
pub struct ConfluenceStrategy {
    config: SignalConfig,
}

impl ConfluenceStrategy {
    pub fn new(config: SignalConfig) -> Self {
        Self { config }
    }
}

impl Strategy for ConfluenceStrategy {
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

        confluence_entry(&snapshot, &self.config).ok_or_else(insufficient)
    }

    fn name(&self) -> &str {
        "ConfluenceStrategy"
    }

    fn min_candles_required(&self) -> usize {
        // Need enough data for the slowest indicator (MACD signal line)
        let params = &self.config.params;
        (params.rsi_period + 1)
            .max(params.macd_slow + params.macd_signal - 1)
            .max(params.volume_window)
    }
}
