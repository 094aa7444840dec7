//! Upstream market data: the `MarketData` seam and its Polymarket implementation

pub mod gamma;
pub mod polymarket;
pub mod retry;

mod lenient;

pub use polymarket::{LeaderboardEntry, PolymarketClient, TraderPosition, TraderTrade};
pub use retry::RetryPolicy;

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a single upstream request, after retries
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Network trouble or rate limiting; worth retrying
    #[error("transient API error: {0}")]
    Transient(String),

    /// Malformed response or unknown identity; retrying will not help
    #[error("permanent API error: {0}")]
    Permanent(String),
}

impl ApiError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Classify a non-success HTTP status
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let msg = format!("HTTP {}: {}", status, truncate(body, 200));
        if status == StatusCode::TOO_MANY_REQUESTS
            || status == StatusCode::REQUEST_TIMEOUT
            || status.is_server_error()
        {
            Self::Transient(msg)
        } else {
            Self::Permanent(msg)
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::from_status(status, &err.to_string());
        }
        if err.is_decode() || err.is_builder() {
            Self::Permanent(err.to_string())
        } else {
            // timeouts, connection resets, body read failures
            Self::Transient(err.to_string())
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Read-only access to the market platform.
///
/// Implementations own their retry discipline: an error returned here is final.
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Most recent trades platform-wide (the active-trader feed)
    async fn recent_trades(&self, limit: u32, offset: u32) -> Result<Vec<TraderTrade>, ApiError>;

    /// Leaderboard page ordered by PnL
    async fn leaderboard(&self, limit: u32, offset: u32)
        -> Result<Vec<LeaderboardEntry>, ApiError>;

    /// Trade history of one trader, newest first
    async fn trader_trades(&self, address: &str, limit: u32)
        -> Result<Vec<TraderTrade>, ApiError>;

    /// Open and settled positions of one trader
    async fn trader_positions(
        &self,
        address: &str,
        limit: u32,
    ) -> Result<Vec<TraderPosition>, ApiError>;

    /// Category and tag labels of the market with this condition id
    async fn market_tags(&self, condition_id: &str) -> Result<Vec<String>, ApiError>;
}
