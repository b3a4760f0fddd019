use async_trait::async_trait;
use serde::Deserialize;

use super::http::HttpClient;
use super::RankingSource;
use crate::config::BotConfig;
use crate::Result;

const RATE_LIMIT_RPM: u32 = 30; // Demo API: 30 requests per minute

/// Response from /coins/markets endpoint
#[derive(Debug, Deserialize)]
struct MarketEntry {
    symbol: String,
    #[serde(default)]
    total_volume: Option<f64>,
}

/// CoinGecko client used as the volume-ranking source
#[derive(Clone)]
pub struct CoinGeckoClient {
    http: HttpClient,
    base_url: String,
    api_key: Option<String>,
}

impl CoinGeckoClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, http: HttpClient) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Build from configuration; `COINGECKO_API_KEY` is optional
    pub fn from_config(config: &BotConfig) -> Result<Self> {
        let http = HttpClient::new("CoinGecko", config.request_timeout(), RATE_LIMIT_RPM)?;
        let api_key = std::env::var("COINGECKO_API_KEY").ok();
        Ok(Self::new(config.ranking_url.clone(), api_key, http))
    }
}

#[async_trait]
impl RankingSource for CoinGeckoClient {
    async fn top_by_volume(&self, limit: usize) -> Result<Vec<String>> {
        let url = format!("{}/coins/markets", self.base_url);
        let per_page = limit.to_string();

        tracing::debug!("Fetching top {} coins by volume", limit);

        let entries: Vec<MarketEntry> = self
            .http
            .get_json(
                || {
                    let request = self.http.inner().get(&url).query(&[
                        ("vs_currency", "usd"),
                        ("order", "volume_desc"),
                        ("per_page", per_page.as_str()),
                        ("page", "1"),
                    ]);
                    match &self.api_key {
                        Some(key) => request.header("x-cg-demo-api-key", key),
                        None => request,
                    }
                },
                "coin markets",
            )
            .await?;

        tracing::debug!(
            "Ranking returned {} coins (top volume: {:?})",
            entries.len(),
            entries.first().and_then(|e| e.total_volume)
        );

        Ok(entries
            .into_iter()
            .take(limit)
            .map(|e| e.symbol.to_uppercase())
            .collect())
    }
}
