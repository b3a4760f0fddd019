//! Runtime configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional TOML
//! file, then `SPOTBOT_*` environment variables. Venue credentials are read
//! from `API_KEY` / `API_SECRET`.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{BotError, Result};

pub const DEFAULT_CONFIG_FILE: &str = "spotbot.toml";
pub const DEFAULT_RANKING_URL: &str = "https://api.coingecko.com/api/v3";
pub const DEFAULT_EXCHANGE_URL: &str = "https://api.binance.com";

/// Intervals accepted by the venue's kline endpoint
const KNOWN_TIMEFRAMES: &[&str] = &[
    "1m", "3m", "5m", "15m", "30m", "1h", "2h", "4h", "6h", "8h", "12h", "1d", "3d", "1w",
    "1M",
];

/// Entry rule variant
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// RSI below threshold only
    Simple,
    /// RSI below threshold, MACD above signal and a volume surge
    Extended,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    pub symbol_suffix: String,
    pub quote_asset: String,
    pub max_positions: usize,
    pub capital_fraction: f64,
    pub rsi_threshold: f64,
    pub rsi_period: usize,
    pub take_profit: f64,
    pub stop_loss: f64,
    pub poll_interval_secs: u64,
    pub candle_timeframe: String,
    pub candle_lookback: usize,
    pub candidate_limit: usize,
    pub strategy: StrategyKind,
    pub volume_multiplier: f64,
    pub volume_window: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub positions_file: PathBuf,
    pub ranking_url: String,
    pub exchange_url: String,
    pub request_timeout_secs: u64,
    pub max_consecutive_failures: u32,
    pub backoff_base_secs: u64,
    pub backoff_max_secs: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            symbol_suffix: "/USDT".to_string(),
            quote_asset: "USDT".to_string(),
            max_positions: 3,
            capital_fraction: 0.10,
            rsi_threshold: 30.0,
            rsi_period: 14,
            take_profit: 1.05,
            stop_loss: 0.97,
            poll_interval_secs: 300,
            candle_timeframe: "1h".to_string(),
            candle_lookback: 100,
            candidate_limit: 20,
            strategy: StrategyKind::Extended,
            volume_multiplier: 1.5,
            volume_window: 20,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            positions_file: PathBuf::from("positions.json"),
            ranking_url: DEFAULT_RANKING_URL.to_string(),
            exchange_url: DEFAULT_EXCHANGE_URL.to_string(),
            request_timeout_secs: 10,
            max_consecutive_failures: 5,
            backoff_base_secs: 30,
            backoff_max_secs: 1800,
        }
    }
}

impl BotConfig {
    /// Load configuration
    ///
    /// With `path = None` the default `spotbot.toml` is used if it exists. An
    /// explicit path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = Config::try_from(&BotConfig::default())?;

        let file = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings = Config::builder()
            .add_source(defaults)
            .add_source(file)
            .add_source(Environment::with_prefix("SPOTBOT").try_parsing(true))
            .build()?;

        let config: BotConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the bot trade nonsensically
    pub fn validate(&self) -> Result<()> {
        fn invalid(msg: String) -> Result<()> {
            Err(BotError::Config(msg))
        }

        if self.max_positions == 0 {
            return invalid("max_positions must be at least 1".to_string());
        }
        if !(self.capital_fraction > 0.0 && self.capital_fraction <= 1.0) {
            return invalid(format!(
                "capital_fraction must be in (0, 1], got {}",
                self.capital_fraction
            ));
        }
        if !(self.rsi_threshold > 0.0 && self.rsi_threshold < 100.0) {
            return invalid(format!(
                "rsi_threshold must be in (0, 100), got {}",
                self.rsi_threshold
            ));
        }
        if self.take_profit <= 1.0 {
            return invalid(format!("take_profit must be > 1, got {}", self.take_profit));
        }
        if !(self.stop_loss > 0.0 && self.stop_loss < 1.0) {
            return invalid(format!("stop_loss must be in (0, 1), got {}", self.stop_loss));
        }
        if self.poll_interval_secs == 0 {
            return invalid("poll_interval_secs must be positive".to_string());
        }
        if !KNOWN_TIMEFRAMES.contains(&self.candle_timeframe.as_str()) {
            return invalid(format!("unknown candle_timeframe {}", self.candle_timeframe));
        }
        if self.candidate_limit == 0 {
            return invalid("candidate_limit must be at least 1".to_string());
        }
        if self.macd_fast == 0 || self.macd_fast >= self.macd_slow || self.macd_signal == 0 {
            return invalid(format!(
                "MACD periods must satisfy 0 < fast < slow and signal > 0, got {}/{}/{}",
                self.macd_fast, self.macd_slow, self.macd_signal
            ));
        }
        if self.rsi_period == 0 || self.volume_window == 0 {
            return invalid("rsi_period and volume_window must be positive".to_string());
        }
        if self.candle_lookback < self.min_candles_required() {
            return invalid(format!(
                "candle_lookback {} is below the {} candles the {:?} strategy needs",
                self.candle_lookback,
                self.min_candles_required(),
                self.strategy
            ));
        }
        if self.max_consecutive_failures == 0 {
            return invalid("max_consecutive_failures must be at least 1".to_string());
        }
        if self.backoff_base_secs > self.backoff_max_secs {
            return invalid("backoff_base_secs must not exceed backoff_max_secs".to_string());
        }
        Ok(())
    }

    /// Candles needed before every indicator of the configured strategy is defined
    pub fn min_candles_required(&self) -> usize {
        let rsi = self.rsi_period + 1;
        match self.strategy {
            StrategyKind::Simple => rsi,
            StrategyKind::Extended => rsi
                .max(self.macd_slow + self.macd_signal - 1)
                .max(self.volume_window),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Venue credentials
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
}

impl Credentials {
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("API_KEY")
            .map_err(|_| BotError::Config("API_KEY not found in environment".to_string()))?;
        let api_secret = std::env::var("API_SECRET")
            .map_err(|_| BotError::Config("API_SECRET not found in environment".to_string()))?;
        Ok(Self {
            api_key,
            api_secret,
        })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"***")
            .field("api_secret", &"***")
            .finish()
    }
}
