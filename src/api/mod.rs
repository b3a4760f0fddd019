//! Clients for the trading venue and the volume-ranking provider
//!
//! The rest of the bot only talks to the [`Exchange`] and [`RankingSource`]
//! traits; symbols cross these seams in `BASE/QUOTE` notation.

pub mod binance;
pub mod coingecko;
pub mod http;

use async_trait::async_trait;
use std::collections::HashSet;

use crate::models::{Candle, TradeSide};
use crate::Result;

pub use binance::BinanceClient;
pub use coingecko::CoinGeckoClient;
pub use http::HttpClient;

/// Acknowledgement of a submitted market order
#[derive(Debug, Clone, PartialEq)]
pub struct OrderAck {
    pub order_id: i64,
    pub symbol: String,
    pub status: String,
}

/// Trading venue contract
#[async_trait]
pub trait Exchange: Send + Sync {
    /// Symbols currently tradable on the venue
    async fn list_markets(&self) -> Result<HashSet<String>>;

    /// OHLCV candles, oldest first
    async fn fetch_candles(&self, symbol: &str, timeframe: &str, limit: usize)
        -> Result<Vec<Candle>>;

    /// Last traded price
    async fn fetch_price(&self, symbol: &str) -> Result<f64>;

    /// Total (free + locked) balance of an asset; zero if absent
    async fn fetch_balance(&self, asset: &str) -> Result<f64>;

    /// Submit an immediate market order for `amount` of the base asset
    async fn market_order(&self, symbol: &str, side: TradeSide, amount: f64) -> Result<OrderAck>;
}

/// Source of base-asset tickers ranked by descending trading volume
#[async_trait]
pub trait RankingSource: Send + Sync {
    /// Upper-case base asset tickers, highest volume first
    async fn top_by_volume(&self, limit: usize) -> Result<Vec<String>>;
}
