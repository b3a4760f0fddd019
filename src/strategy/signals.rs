use crate::config::BotConfig;
use crate::indicators::{IndicatorParams, IndicatorSnapshot};
use crate::models::{Position, Signal};

/// Configuration for entry signal generation
#[derive(Debug, Clone)]
pub struct SignalConfig {
    pub rsi_threshold: f64,
    pub volume_multiplier: f64, // Multiple of average volume
    pub params: IndicatorParams,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            rsi_threshold: 30.0,
            volume_multiplier: 1.5,
            params: IndicatorParams::default(),
        }
    }
}

impl From<&BotConfig> for SignalConfig {
    fn from(config: &BotConfig) -> Self {
        Self {
            rsi_threshold: config.rsi_threshold,
            volume_multiplier: config.volume_multiplier,
            params: IndicatorParams::from(config),
        }
    }
}

/// Why a position was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    TakeProfit,
    StopLoss,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitReason::TakeProfit => write!(f, "take-profit"),
            ExitReason::StopLoss => write!(f, "stop-loss"),
        }
    }
}

/// Price multipliers relative to entry that close a position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitRule {
    pub take_profit: f64,
    pub stop_loss: f64,
}

impl Default for ExitRule {
    fn default() -> Self {
        Self {
            take_profit: 1.05,
            stop_loss: 0.97,
        }
    }
}

impl From<&BotConfig> for ExitRule {
    fn from(config: &BotConfig) -> Self {
        Self {
            take_profit: config.take_profit,
            stop_loss: config.stop_loss,
        }
    }
}

impl ExitRule {
    /// Check a held position against the current price
    pub fn check(&self, position: &Position, current_price: f64) -> Option<ExitReason> {
        if current_price >= position.buy_price * self.take_profit {
            Some(ExitReason::TakeProfit)
        } else if current_price <= position.buy_price * self.stop_loss {
            Some(ExitReason::StopLoss)
        } else {
            None
        }
    }
}

/// RSI-only entry: buy when oversold
///
/// Returns `None` if RSI is undefined for this window.
pub fn rsi_entry(snapshot: &IndicatorSnapshot, config: &SignalConfig) -> Option<Signal> {
    let rsi = snapshot.rsi?;
    if rsi < config.rsi_threshold {
        Some(Signal::Buy)
    } else {
        Some(Signal::Hold)
    }
}

/// Oversold RSI confirmed by a bullish MACD and a volume surge
///
/// Returns `None` if any of the three indicators is undefined.
pub fn confluence_entry(snapshot: &IndicatorSnapshot, config: &SignalConfig) -> Option<Signal> {
    let rsi = snapshot.rsi?;
    let macd = snapshot.macd?;
    let avg_volume = snapshot.avg_volume?;

    // A zero average gives no ratio and never counts as a surge
    let volume_ratio = snapshot.volume_ratio();

    let conditions = [
        rsi < config.rsi_threshold,
        macd.is_bullish(),
        volume_ratio.is_some_and(|r| r > config.volume_multiplier),
    ];

    tracing::debug!(
        "RSI={:.2} MACD={:.4}/{:.4} Vol={:.0} (avg {:.0}, x{:.2}) -> {:?}",
        rsi,
        macd.line,
        macd.signal,
        snapshot.volume,
        avg_volume,
        volume_ratio.unwrap_or(0.0),
        conditions
    );

    if conditions.iter().all(|&x| x) {
        Some(Signal::Buy)
    } else {
        Some(Signal::Hold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::Macd;

    fn snapshot(rsi: f64, line: f64, signal: f64, volume: f64, avg_volume: f64) -> IndicatorSnapshot {
        IndicatorSnapshot {
            price: 100.0,
            volume,
            rsi: Some(rsi),
            macd: Some(Macd {
                line,
                signal,
                histogram: line - signal,
            }),
            avg_volume: Some(avg_volume),
        }
    }

    #[test]
    fn test_rsi_entry_threshold() {
        let config = SignalConfig::default();

        assert_eq!(rsi_entry(&snapshot(25.0, 0.0, 0.0, 0.0, 1.0), &config), Some(Signal::Buy));
        assert_eq!(rsi_entry(&snapshot(30.0, 0.0, 0.0, 0.0, 1.0), &config), Some(Signal::Hold));
        assert_eq!(rsi_entry(&snapshot(55.0, 0.0, 0.0, 0.0, 1.0), &config), Some(Signal::Hold));
    }

    #[test]
    fn test_rsi_entry_undefined() {
        let mut snap = snapshot(25.0, 0.0, 0.0, 0.0, 1.0);
        snap.rsi = None;
        assert_eq!(rsi_entry(&snap, &SignalConfig::default()), None);
    }

    #[test]
    fn test_confluence_requires_all_three() {
        let config = SignalConfig::default();

        // All conditions met
        let snap = snapshot(25.0, 0.5, 0.2, 1600.0, 1000.0);
        assert_eq!(confluence_entry(&snap, &config), Some(Signal::Buy));

        // MACD below signal
        let snap = snapshot(25.0, 0.1, 0.2, 1600.0, 1000.0);
        assert_eq!(confluence_entry(&snap, &config), Some(Signal::Hold));

        // Volume exactly 1.5x is not a surge
        let snap = snapshot(25.0, 0.5, 0.2, 1500.0, 1000.0);
        assert_eq!(confluence_entry(&snap, &config), Some(Signal::Hold));

        // RSI not oversold
        let snap = snapshot(35.0, 0.5, 0.2, 1600.0, 1000.0);
        assert_eq!(confluence_entry(&snap, &config), Some(Signal::Hold));
    }

    #[test]
    fn test_confluence_undefined_macd() {
        let mut snap = snapshot(25.0, 0.5, 0.2, 1600.0, 1000.0);
        snap.macd = None;
        assert_eq!(confluence_entry(&snap, &SignalConfig::default()), None);
    }

    #[test]
    fn test_confluence_zero_average_volume_holds() {
        let snap = snapshot(25.0, 0.5, 0.2, 1600.0, 0.0);
        assert_eq!(confluence_entry(&snap, &SignalConfig::default()), Some(Signal::Hold));
    }

    #[test]
    fn test_exit_take_profit() {
        let rule = ExitRule::default();
        let position = Position::new("BTC/USDT", 50000.0, 0.002);

        assert_eq!(rule.check(&position, 52600.0), Some(ExitReason::TakeProfit));
        assert_eq!(rule.check(&position, 52500.0), Some(ExitReason::TakeProfit));
    }

    #[test]
    fn test_exit_stop_loss() {
        let rule = ExitRule::default();
        let position = Position::new("BTC/USDT", 50000.0, 0.002);

        assert_eq!(rule.check(&position, 48500.0), Some(ExitReason::StopLoss));
        assert_eq!(rule.check(&position, 40000.0), Some(ExitReason::StopLoss));
    }

    #[test]
    fn test_exit_holds_inside_band() {
        let rule = ExitRule::default();
        let position = Position::new("BTC/USDT", 50000.0, 0.002);

        for price in [48501.0, 49000.0, 50000.0, 51000.0, 52499.0] {
            assert_eq!(rule.check(&position, price), None, "price {}", price);
        }
    }

    #[test]
    fn test_signal_config_from_bot_config() {
        let bot = BotConfig {
            rsi_threshold: 25.0,
            volume_multiplier: 2.0,
            ..Default::default()
        };
        let config = SignalConfig::from(&bot);

        assert_eq!(config.rsi_threshold, 25.0);
        assert_eq!(config.volume_multiplier, 2.0);
    }
}
