use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

use super::http::{decode_json, HttpClient};
use super::{Exchange, OrderAck};
use crate::config::{BotConfig, Credentials};
use crate::error::{BotError, Result};
use crate::models::{Candle, TradeSide};

type HmacSha256 = Hmac<Sha256>;

// Binance allows 1200 request weight per minute; stay well under it
const RATE_LIMIT_RPM: u32 = 600;
const RECV_WINDOW_MS: u64 = 5000;

// ============== Response Types ==============

#[derive(Debug, Deserialize)]
struct ExchangeInfo {
    symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SymbolInfo {
    symbol: String,
    status: String,
    base_asset: String,
    quote_asset: String,
    #[serde(default)]
    filters: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct TickerPrice {
    price: String,
}

#[derive(Debug, Deserialize)]
struct AccountInfo {
    balances: Vec<AssetBalance>,
}

#[derive(Debug, Deserialize)]
struct AssetBalance {
    asset: String,
    free: String,
    locked: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderResponse {
    order_id: i64,
    symbol: String,
    status: String,
}

/// Trading rules cached from exchangeInfo
#[derive(Debug, Clone)]
struct MarketInfo {
    wire_symbol: String,
    step_size: Option<f64>,
}

/// Binance spot REST client
///
/// Market listing is cached on every `list_markets` call and used to
/// translate `BASE/QUOTE` symbols and round order quantities to the lot size.
pub struct BinanceClient {
    http: HttpClient,
    base_url: String,
    credentials: Credentials,
    markets: RwLock<HashMap<String, MarketInfo>>,
}

impl BinanceClient {
    pub fn new(base_url: impl Into<String>, credentials: Credentials, http: HttpClient) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
            markets: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &BotConfig, credentials: Credentials) -> Result<Self> {
        let http = HttpClient::new("Binance", config.request_timeout(), RATE_LIMIT_RPM)?;
        Ok(Self::new(config.exchange_url.clone(), credentials, http))
    }

    /// Sign a query string with HMAC-SHA256
    fn sign(&self, query: &str) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(self.credentials.api_secret.as_bytes())
            .map_err(|e| BotError::Config(format!("invalid API secret: {}", e)))?;
        mac.update(query.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Append timestamp, recvWindow and signature to a query string
    fn signed_query(&self, params: &str) -> Result<String> {
        let timestamp = Utc::now().timestamp_millis();
        let query = if params.is_empty() {
            format!("recvWindow={}&timestamp={}", RECV_WINDOW_MS, timestamp)
        } else {
            format!("{}&recvWindow={}&timestamp={}", params, RECV_WINDOW_MS, timestamp)
        };
        let signature = self.sign(&query)?;
        Ok(format!("{}&signature={}", query, signature))
    }

    /// Venue notation for a `BASE/QUOTE` symbol
    async fn wire_symbol(&self, symbol: &str) -> String {
        match self.markets.read().await.get(symbol) {
            Some(info) => info.wire_symbol.clone(),
            None => symbol.replace('/', ""),
        }
    }

    /// Round a quantity down to the market's lot size
    async fn format_quantity(&self, symbol: &str, amount: f64) -> String {
        let step = self
            .markets
            .read()
            .await
            .get(symbol)
            .and_then(|m| m.step_size);
        format_quantity(amount, step)
    }
}

#[async_trait]
impl Exchange for BinanceClient {
    async fn list_markets(&self) -> Result<HashSet<String>> {
        let url = format!("{}/api/v3/exchangeInfo", self.base_url);
        let info: ExchangeInfo = self
            .http
            .get_json(|| self.http.inner().get(&url), "exchangeInfo")
            .await?;

        let mut markets = HashMap::new();
        for s in info.symbols.into_iter().filter(|s| s.status == "TRADING") {
            let step_size = lot_step_size(&s.filters);
            markets.insert(
                format!("{}/{}", s.base_asset, s.quote_asset),
                MarketInfo {
                    wire_symbol: s.symbol,
                    step_size,
                },
            );
        }

        tracing::debug!("Loaded {} tradable Binance markets", markets.len());

        let symbols = markets.keys().cloned().collect();
        *self.markets.write().await = markets;
        Ok(symbols)
    }

    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: &str,
        limit: usize,
    ) -> Result<Vec<Candle>> {
        let url = format!("{}/api/v3/klines", self.base_url);
        let wire = self.wire_symbol(symbol).await;
        let limit = limit.to_string();

        let rows: Vec<Vec<serde_json::Value>> = self
            .http
            .get_json(
                || {
                    self.http.inner().get(&url).query(&[
                        ("symbol", wire.as_str()),
                        ("interval", timeframe),
                        ("limit", limit.as_str()),
                    ])
                },
                "klines",
            )
            .await?;

        rows.iter().map(|row| parse_kline(row)).collect()
    }

    async fn fetch_price(&self, symbol: &str) -> Result<f64> {
        let url = format!("{}/api/v3/ticker/price", self.base_url);
        let wire = self.wire_symbol(symbol).await;

        let ticker: TickerPrice = self
            .http
            .get_json(
                || self.http.inner().get(&url).query(&[("symbol", wire.as_str())]),
                "ticker price",
            )
            .await?;

        parse_decimal(&ticker.price, "ticker price")
    }

    async fn fetch_balance(&self, asset: &str) -> Result<f64> {
        let url = format!("{}/api/v3/account", self.base_url);

        // Signed per attempt so retries carry a fresh timestamp
        let account: AccountInfo = self
            .http
            .try_get_json(
                || {
                    let query = self.signed_query("omitZeroBalances=true")?;
                    Ok(self
                        .http
                        .inner()
                        .get(format!("{}?{}", url, query))
                        .header("X-MBX-APIKEY", &self.credentials.api_key))
                },
                "account",
            )
            .await?;

        match account.balances.iter().find(|b| b.asset == asset) {
            Some(b) => {
                Ok(parse_decimal(&b.free, "free balance")? + parse_decimal(&b.locked, "locked balance")?)
            }
            None => Ok(0.0),
        }
    }

    async fn market_order(&self, symbol: &str, side: TradeSide, amount: f64) -> Result<OrderAck> {
        let url = format!("{}/api/v3/order", self.base_url);
        let wire = self.wire_symbol(symbol).await;
        let quantity = self.format_quantity(symbol, amount).await;

        let params = format!(
            "symbol={}&side={}&type=MARKET&quantity={}",
            wire,
            side.as_str(),
            quantity
        );
        let body = self.signed_query(&params)?;

        tracing::debug!("Placing {} {} {} @ MARKET", side.as_str(), quantity, wire);

        // Orders are not idempotent: no retry
        let response = self
            .http
            .send_once(
                self.http
                    .inner()
                    .post(&url)
                    .header("X-MBX-APIKEY", &self.credentials.api_key)
                    .header("Content-Type", "application/x-www-form-urlencoded")
                    .body(body),
            )
            .await?;

        let order: OrderResponse = decode_json(response, "order response").await?;

        Ok(OrderAck {
            order_id: order.order_id,
            symbol: order.symbol,
            status: order.status,
        })
    }
}

fn parse_decimal(s: &str, what: &'static str) -> Result<f64> {
    s.parse::<f64>().map_err(|e| BotError::Parse {
        what,
        detail: format!("{:?}: {}", s, e),
    })
}

/// Decode one kline row: [openTime, open, high, low, close, volume, ...]
fn parse_kline(row: &[serde_json::Value]) -> Result<Candle> {
    let bad = |detail: &str| BotError::Parse {
        what: "kline",
        detail: detail.to_string(),
    };

    if row.len() < 6 {
        return Err(bad(&format!("expected at least 6 fields, got {}", row.len())));
    }

    let open_time = row[0].as_i64().ok_or_else(|| bad("open time is not an integer"))?;
    let timestamp = Utc
        .timestamp_millis_opt(open_time)
        .single()
        .ok_or_else(|| bad("open time out of range"))?;

    let field = |i: usize| -> Result<f64> {
        let s = row[i].as_str().ok_or_else(|| bad("price field is not a string"))?;
        parse_decimal(s, "kline")
    };

    Ok(Candle {
        timestamp,
        open: field(1)?,
        high: field(2)?,
        low: field(3)?,
        close: field(4)?,
        volume: field(5)?,
    })
}

/// LOT_SIZE step from an exchangeInfo filter list
fn lot_step_size(filters: &[serde_json::Value]) -> Option<f64> {
    filters
        .iter()
        .find(|f| f.get("filterType").and_then(|t| t.as_str()) == Some("LOT_SIZE"))
        .and_then(|f| f.get("stepSize"))
        .and_then(|s| s.as_str())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|step| *step > 0.0)
}

/// Format a quantity, flooring to `step` when known
fn format_quantity(amount: f64, step: Option<f64>) -> String {
    match step {
        Some(step) => {
            let decimals = (-step.log10()).round().max(0.0) as usize;
            // Small epsilon guards against 0.3 / 0.1 = 2.9999999
            let steps = (amount / step + 1e-9).floor();
            format!("{:.*}", decimals, steps * step)
        }
        None => {
            let s = format!("{:.8}", amount);
            s.trim_end_matches('0').trim_end_matches('.').to_string()
        }
    }
}
