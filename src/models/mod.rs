use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV candlestick for one time bucket
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Open position as persisted in the position store
///
/// The symbol is the map key, so it is not serialized with the record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Position {
    #[serde(skip)]
    pub symbol: String,
    pub buy_price: f64,
    pub amount: f64,
}

impl Position {
    pub fn new(symbol: impl Into<String>, buy_price: f64, amount: f64) -> Self {
        Self {
            symbol: symbol.into(),
            buy_price,
            amount,
        }
    }

    /// Notional value at entry, in quote currency
    pub fn cost_basis(&self) -> f64 {
        self.buy_price * self.amount
    }

    /// Unrealized P&L at the given price
    pub fn pnl_at(&self, price: f64) -> f64 {
        (price - self.buy_price) * self.amount
    }
}

/// Entry signal
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum Signal {
    Buy,
    Hold,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    /// Side as the venue spells it
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "BUY",
            TradeSide::Sell => "SELL",
        }
    }
}
