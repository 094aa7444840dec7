//! Polymarket public API client: no authentication required
//!
//! Uses `data-api.polymarket.com` for the trade feed, leaderboard, per-trader
//! trades and positions, and `gamma-api.polymarket.com` for market tags.

use super::gamma::GammaMarket;
use super::lenient;
use super::{ApiError, MarketData, RetryPolicy};
use crate::config::ScanConfig;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const DATA_API_URL: &str = "https://data-api.polymarket.com";
pub const GAMMA_API_URL: &str = "https://gamma-api.polymarket.com";

// ---------------------------------------------------------------------------
// Deserialization structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    #[serde(default)]
    pub rank: Option<serde_json::Value>,
    pub proxy_wallet: Option<String>,
    pub user_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub vol: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub pnl: Option<f64>,
}

/// Wrapper: the leaderboard endpoint may return `{ "leaderboard": [...] }`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LeaderboardResponse {
    Wrapped { leaderboard: Vec<LeaderboardEntry> },
    Bare(Vec<LeaderboardEntry>),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraderPosition {
    pub proxy_wallet: Option<String>,
    pub condition_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub size: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub avg_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub cash_pnl: Option<f64>,
    pub title: Option<String>,
    pub slug: Option<String>,
    pub event_slug: Option<String>,
    pub outcome: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraderTrade {
    pub proxy_wallet: Option<String>,
    pub side: Option<String>,
    pub condition_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub size: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub usdc_size: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub timestamp: Option<i64>,
    pub title: Option<String>,
    pub slug: Option<String>,
    pub event_slug: Option<String>,
    pub outcome: Option<String>,
    pub name: Option<String>,
    pub pseudonym: Option<String>,
}

impl TraderTrade {
    /// USDC notional: `usdcSize`, or `size × price` when that is missing or zero
    pub fn notional(&self) -> f64 {
        match self.usdc_size {
            Some(v) if v != 0.0 => v.abs(),
            _ => (self.size.unwrap_or(0.0) * self.price.unwrap_or(1.0)).abs(),
        }
    }
}

// ---------------------------------------------------------------------------
// Client implementation
// ---------------------------------------------------------------------------

/// Polymarket data + gamma API client with retry
#[derive(Clone)]
pub struct PolymarketClient {
    client: Client,
    data_url: String,
    gamma_url: String,
    retry: RetryPolicy,
}

impl PolymarketClient {
    pub fn new(config: &ScanConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            data_url: config.data_api_url.trim_end_matches('/').to_string(),
            gamma_url: config.gamma_api_url.trim_end_matches('/').to_string(),
            retry: config.retry.clone(),
        })
    }

    /// GET with retry; non-2xx statuses and undecodable bodies are classified
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        self.retry
            .run(url, move || async move {
                let resp = self
                    .client
                    .get(url)
                    .header(ACCEPT, "application/json")
                    .query(query)
                    .send()
                    .await?;

                let status = resp.status();
                let body = resp.text().await?;
                if !status.is_success() {
                    return Err(ApiError::from_status(status, &body));
                }

                serde_json::from_str(&body).map_err(|e| {
                    ApiError::Permanent(format!("malformed response from {}: {}", url, e))
                })
            })
            .await
    }
}

#[async_trait]
impl MarketData for PolymarketClient {
    /// GET /trades: platform-wide recent trades
    async fn recent_trades(&self, limit: u32, offset: u32) -> Result<Vec<TraderTrade>, ApiError> {
        let url = format!("{}/trades", self.data_url);
        debug!(limit, offset, "Fetching recent trades");
        self.get_json(&url, &[("limit", limit.to_string()), ("offset", offset.to_string())])
            .await
    }

    /// GET /v1/leaderboard: top traders by PnL
    async fn leaderboard(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<LeaderboardEntry>, ApiError> {
        let url = format!("{}/v1/leaderboard", self.data_url);
        debug!(limit, offset, "Fetching leaderboard");
        let resp: LeaderboardResponse = self
            .get_json(
                &url,
                &[
                    ("category", "OVERALL".to_string()),
                    ("timePeriod", "ALL".to_string()),
                    ("orderBy", "PNL".to_string()),
                    ("limit", limit.to_string()),
                    ("offset", offset.to_string()),
                ],
            )
            .await?;

        Ok(match resp {
            LeaderboardResponse::Wrapped { leaderboard } => leaderboard,
            LeaderboardResponse::Bare(entries) => entries,
        })
    }

    /// GET /trades?user={address}
    async fn trader_trades(
        &self,
        address: &str,
        limit: u32,
    ) -> Result<Vec<TraderTrade>, ApiError> {
        let url = format!("{}/trades", self.data_url);
        debug!(address, "Fetching trades");
        let trades: Vec<TraderTrade> = self
            .get_json(&url, &[("user", address.to_string()), ("limit", limit.to_string())])
            .await?;
        debug!(address, count = trades.len(), "Trades fetched");
        Ok(trades)
    }

    /// GET /positions?user={address}
    async fn trader_positions(
        &self,
        address: &str,
        limit: u32,
    ) -> Result<Vec<TraderPosition>, ApiError> {
        let url = format!("{}/positions", self.data_url);
        debug!(address, "Fetching positions");
        let positions: Vec<TraderPosition> = self
            .get_json(
                &url,
                &[
                    ("user", address.to_string()),
                    ("limit", limit.to_string()),
                    ("sizeThreshold", "0".to_string()),
                ],
            )
            .await?;
        debug!(address, count = positions.len(), "Positions fetched");
        Ok(positions)
    }

    /// GET gamma /markets?condition_ids={id}
    async fn market_tags(&self, condition_id: &str) -> Result<Vec<String>, ApiError> {
        let url = format!("{}/markets", self.gamma_url);
        let markets: Vec<GammaMarket> = self
            .get_json(&url, &[("condition_ids", condition_id.to_string())])
            .await?;
        Ok(markets.iter().flat_map(GammaMarket::tag_labels).collect())
    }
}
