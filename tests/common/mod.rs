#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::DateTime;

use spotbot::api::{Exchange, OrderAck, RankingSource};
use spotbot::config::StrategyKind;
use spotbot::execution::{MarketDataGateway, TradingCycle};
use spotbot::persistence::PositionStore;
use spotbot::{BotConfig, BotError, Candle, Result, TradeSide};

fn fake_error(message: &str) -> BotError {
    BotError::Api {
        service: "fake",
        status: 500,
        message: message.to_string(),
    }
}

/// In-memory venue that records every order it receives
#[derive(Default)]
pub struct FakeExchange {
    markets: Mutex<HashSet<String>>,
    candles: Mutex<HashMap<String, Vec<Candle>>>,
    prices: Mutex<HashMap<String, f64>>,
    balance: Mutex<Option<f64>>,
    orders: Mutex<Vec<(String, TradeSide, f64)>>,
    balance_calls: AtomicUsize,
}

impl FakeExchange {
    pub fn with_balance(balance: f64) -> Self {
        let exchange = Self::default();
        exchange.set_balance(Some(balance));
        exchange
    }

    /// List a market with its candle history; the last close is its price
    pub fn list(&self, symbol: &str, candles: Vec<Candle>) {
        if let Some(last) = candles.last() {
            self.set_price(symbol, last.close);
        }
        self.markets.lock().unwrap().insert(symbol.to_string());
        self.candles
            .lock()
            .unwrap()
            .insert(symbol.to_string(), candles);
    }

    /// List a market that has no candle history
    pub fn list_without_candles(&self, symbol: &str) {
        self.markets.lock().unwrap().insert(symbol.to_string());
    }

    pub fn set_price(&self, symbol: &str, price: f64) {
        self.prices
            .lock()
            .unwrap()
            .insert(symbol.to_string(), price);
    }

    /// `None` makes balance requests fail
    pub fn set_balance(&self, balance: Option<f64>) {
        *self.balance.lock().unwrap() = balance;
    }

    pub fn orders(&self) -> Vec<(String, TradeSide, f64)> {
        self.orders.lock().unwrap().clone()
    }

    pub fn balance_calls(&self) -> usize {
        self.balance_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Exchange for FakeExchange {
    async fn list_markets(&self) -> Result<HashSet<String>> {
        Ok(self.markets.lock().unwrap().clone())
    }

    async fn fetch_candles(&self, symbol: &str, _timeframe: &str, limit: usize) -> Result<Vec<Candle>> {
        let candles = self.candles.lock().unwrap().get(symbol).cloned();
        let candles = candles.ok_or_else(|| fake_error(&format!("no klines for {}", symbol)))?;
        let skip = candles.len().saturating_sub(limit);
        Ok(candles[skip..].to_vec())
    }

    async fn fetch_price(&self, symbol: &str) -> Result<f64> {
        let price = self.prices.lock().unwrap().get(symbol).copied();
        price.ok_or_else(|| fake_error(&format!("no ticker for {}", symbol)))
    }

    async fn fetch_balance(&self, _asset: &str) -> Result<f64> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        let balance = *self.balance.lock().unwrap();
        balance.ok_or_else(|| fake_error("account unavailable"))
    }

    async fn market_order(&self, symbol: &str, side: TradeSide, amount: f64) -> Result<OrderAck> {
        let mut orders = self.orders.lock().unwrap();
        orders.push((symbol.to_string(), side, amount));
        Ok(OrderAck {
            order_id: orders.len() as i64,
            symbol: symbol.to_string(),
            status: "FILLED".to_string(),
        })
    }
}

/// Ranking that returns a fixed list, or fails when given `None`
pub struct FakeRanking {
    ranked: Option<Vec<String>>,
    calls: AtomicUsize,
}

impl FakeRanking {
    pub fn new(ranked: &[&str]) -> Self {
        Self {
            ranked: Some(ranked.iter().map(|s| s.to_string()).collect()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            ranked: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RankingSource for FakeRanking {
    async fn top_by_volume(&self, limit: usize) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.ranked {
            Some(ranked) => Ok(ranked.iter().take(limit).cloned().collect()),
            None => Err(fake_error("ranking unavailable")),
        }
    }
}

fn candle(index: usize, close: f64) -> Candle {
    Candle {
        timestamp: DateTime::from_timestamp(1_700_000_000 + index as i64 * 3600, 0).unwrap(),
        open: close,
        high: close,
        low: close,
        close,
        volume: 1_000.0,
    }
}

/// Steady decline ending at `last_close`; RSI is 0
pub fn selloff(last_close: f64, len: usize) -> Vec<Candle> {
    (0..len)
        .map(|i| candle(i, last_close + (len - 1 - i) as f64 * 100.0))
        .collect()
}

/// Steady climb ending at `last_close`; RSI is 100
pub fn rally(last_close: f64, len: usize) -> Vec<Candle> {
    (0..len)
        .map(|i| candle(i, last_close - (len - 1 - i) as f64 * 0.01 * last_close / len as f64))
        .collect()
}

/// Long decline that slows over the last 15 bars, ending on a 5x volume
/// spike; oversold with MACD crossing above its signal line
pub fn capitulation(len: usize) -> Vec<Candle> {
    let fast = len - 15;
    let mut close = 2000.0;
    let mut candles: Vec<Candle> = (0..len)
        .map(|i| {
            let c = candle(i, close);
            close -= if i < fast { 10.0 } else { 1.0 };
            c
        })
        .collect();
    if let Some(last) = candles.last_mut() {
        last.volume = 5_000.0;
    }
    candles
}

pub fn test_config() -> BotConfig {
    BotConfig {
        strategy: StrategyKind::Simple,
        ..Default::default()
    }
}

pub fn extended_config() -> BotConfig {
    BotConfig {
        strategy: StrategyKind::Extended,
        ..Default::default()
    }
}

pub fn build_cycle(
    config: BotConfig,
    exchange: Arc<FakeExchange>,
    ranking: Arc<FakeRanking>,
    positions_file: &Path,
) -> TradingCycle {
    let gateway = MarketDataGateway::new(exchange, ranking, config.symbol_suffix.clone());
    TradingCycle::new(config, gateway, PositionStore::new(positions_file))
}

pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}
