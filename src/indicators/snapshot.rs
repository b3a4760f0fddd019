use crate::config::BotConfig;
use crate::models::Candle;

use super::{calculate_macd, calculate_rsi, rolling_average, Macd};

/// Indicator periods used to build a snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorParams {
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub volume_window: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            volume_window: 20,
        }
    }
}

impl From<&BotConfig> for IndicatorParams {
    fn from(config: &BotConfig) -> Self {
        Self {
            rsi_period: config.rsi_period,
            macd_fast: config.macd_fast,
            macd_slow: config.macd_slow,
            macd_signal: config.macd_signal,
            volume_window: config.volume_window,
        }
    }
}

/// Latest indicator values for one symbol, computed from one candle window
///
/// Fields are `None` when the window is too short for that indicator.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSnapshot {
    pub price: f64,
    pub volume: f64,
    pub rsi: Option<f64>,
    pub macd: Option<Macd>,
    pub avg_volume: Option<f64>,
}

impl IndicatorSnapshot {
    /// Build a snapshot from candles ordered oldest first
    ///
    /// Returns `None` for an empty window.
    pub fn from_candles(candles: &[Candle], params: &IndicatorParams) -> Option<Self> {
        let latest = candles.last()?;

        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let volumes: Vec<f64> = candles.iter().map(|c| c.volume).collect();

        Some(Self {
            price: latest.close,
            volume: latest.volume,
            rsi: calculate_rsi(&closes, params.rsi_period),
            macd: calculate_macd(
                &closes,
                params.macd_fast,
                params.macd_slow,
                params.macd_signal,
            ),
            avg_volume: rolling_average(&volumes, params.volume_window),
        })
    }

    /// Latest volume relative to its rolling average
    pub fn volume_ratio(&self) -> Option<f64> {
        match self.avg_volume {
            Some(avg) if avg > 0.0 => Some(self.volume / avg),
            _ => None,
        }
    }
}
