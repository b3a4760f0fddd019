// Technical indicators module
// Implements RSI, MACD and moving averages over a candle window

pub mod macd;
pub mod moving_average;
pub mod rsi;
pub mod snapshot;

pub use macd::{calculate_macd, Macd};
pub use moving_average::{calculate_ema, calculate_ema_series, calculate_sma, rolling_average};
pub use rsi::calculate_rsi;
pub use snapshot::{IndicatorParams, IndicatorSnapshot};
