use std::collections::HashSet;
use std::sync::Arc;

use crate::api::{Exchange, OrderAck, RankingSource};
use crate::models::{Candle, TradeSide};
use crate::Result;

/// Single entry point for market data and order placement
///
/// Combines the volume ranking with the venue's listings and forwards
/// everything else to the venue client.
pub struct MarketDataGateway {
    exchange: Arc<dyn Exchange>,
    ranking: Arc<dyn RankingSource>,
    symbol_suffix: String,
}

impl MarketDataGateway {
    pub fn new(
        exchange: Arc<dyn Exchange>,
        ranking: Arc<dyn RankingSource>,
        symbol_suffix: impl Into<String>,
    ) -> Self {
        Self {
            exchange,
            ranking,
            symbol_suffix: symbol_suffix.into(),
        }
    }

    /// Top-volume symbols the venue lists, in ranking order
    pub async fn top_candidates(&self, limit: usize) -> Result<Vec<String>> {
        let ranked = self.ranking.top_by_volume(limit).await?;
        let markets = self.exchange.list_markets().await?;

        let candidates = map_to_listed(&ranked, &self.symbol_suffix, &markets);

        tracing::info!(
            "🔍 {} of {} top-volume coins are listed: {}",
            candidates.len(),
            ranked.len(),
            candidates.join(", ")
        );

        Ok(candidates)
    }

    pub async fn candles(&self, symbol: &str, timeframe: &str, limit: usize) -> Result<Vec<Candle>> {
        self.exchange.fetch_candles(symbol, timeframe, limit).await
    }

    pub async fn latest_price(&self, symbol: &str) -> Result<f64> {
        self.exchange.fetch_price(symbol).await
    }

    pub async fn balance(&self, asset: &str) -> Result<f64> {
        self.exchange.fetch_balance(asset).await
    }

    pub async fn market_buy(&self, symbol: &str, amount: f64) -> Result<OrderAck> {
        self.exchange.market_order(symbol, TradeSide::Buy, amount).await
    }

    pub async fn market_sell(&self, symbol: &str, amount: f64) -> Result<OrderAck> {
        self.exchange.market_order(symbol, TradeSide::Sell, amount).await
    }
}

/// Append the quote suffix and keep listed symbols, dropping duplicates
fn map_to_listed(ranked: &[String], suffix: &str, markets: &HashSet<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    ranked
        .iter()
        .map(|base| format!("{}{}", base.to_uppercase(), suffix))
        .filter(|symbol| markets.contains(symbol))
        .filter(|symbol| seen.insert(symbol.clone()))
        .collect()
}
