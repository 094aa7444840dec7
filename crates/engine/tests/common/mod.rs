use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use engine::api::{
    ApiError, LeaderboardEntry, MarketData, RetryPolicy, TraderPosition, TraderTrade,
};
use engine::ScanConfig;

/// In-memory market with a fixed trader feed
#[derive(Default)]
pub struct FakeMarket {
    pub feed: Vec<TraderTrade>,
    pub trades: HashMap<String, Vec<TraderTrade>>,
    pub positions: HashMap<String, Vec<TraderPosition>>,
    pub failing: HashMap<String, ApiError>,
    pub tags: HashMap<String, Vec<String>>,
    pub trade_calls: AtomicUsize,
    /// Time each trade-history fetch takes; zero answers immediately
    pub trade_latency: Duration,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

#[allow(dead_code)]
impl FakeMarket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a trader with `trade_count` trades on `event_slug` and the given position PnLs
    pub fn with_trader(
        mut self,
        address: &str,
        trade_count: usize,
        event_slug: &str,
        position_pnls: &[f64],
    ) -> Self {
        let trades: Vec<TraderTrade> = (0..trade_count)
            .map(|i| make_trade(address, &format!("{}-m{}", event_slug, i % 3), event_slug, i))
            .collect();
        if let Some(first) = trades.first() {
            self.feed.push(first.clone());
        }
        self.trades.insert(address.to_string(), trades);
        self.positions.insert(
            address.to_string(),
            position_pnls
                .iter()
                .enumerate()
                .map(|(i, pnl)| {
                    let cid = format!("{}-m{}", event_slug, i % 3);
                    make_position(address, &cid, event_slug, *pnl)
                })
                .collect(),
        );
        self
    }

    pub fn failing(mut self, address: &str, error: ApiError) -> Self {
        self.feed.push(TraderTrade {
            proxy_wallet: Some(address.to_string()),
            ..Default::default()
        });
        self.failing.insert(address.to_string(), error);
        self
    }

    pub fn trade_calls(&self) -> usize {
        self.trade_calls.load(Ordering::SeqCst)
    }

    pub fn with_trade_latency(mut self, latency: Duration) -> Self {
        self.trade_latency = latency;
        self
    }

    /// Most trade-history fetches seen running at once
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketData for FakeMarket {
    async fn recent_trades(&self, limit: u32, offset: u32) -> Result<Vec<TraderTrade>, ApiError> {
        Ok(self
            .feed
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn leaderboard(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<LeaderboardEntry>, ApiError> {
        Ok(self
            .feed
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|t| LeaderboardEntry {
                rank: None,
                proxy_wallet: t.proxy_wallet.clone(),
                user_name: t.name.clone(),
                vol: None,
                pnl: None,
            })
            .collect())
    }

    async fn trader_trades(&self, address: &str, limit: u32) -> Result<Vec<TraderTrade>, ApiError> {
        self.trade_calls.fetch_add(1, Ordering::SeqCst);
        if !self.trade_latency.is_zero() {
            let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
            tokio::time::sleep(self.trade_latency).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
        if let Some(err) = self.failing.get(address) {
            return Err(err.clone());
        }
        Ok(self
            .trades
            .get(address)
            .map(|t| t.iter().take(limit as usize).cloned().collect())
            .unwrap_or_default())
    }

    async fn trader_positions(
        &self,
        address: &str,
        limit: u32,
    ) -> Result<Vec<TraderPosition>, ApiError> {
        Ok(self
            .positions
            .get(address)
            .map(|p| p.iter().take(limit as usize).cloned().collect())
            .unwrap_or_default())
    }

    async fn market_tags(&self, condition_id: &str) -> Result<Vec<String>, ApiError> {
        self.tags
            .get(condition_id)
            .cloned()
            .ok_or_else(|| ApiError::Permanent(format!("unknown market {}", condition_id)))
    }
}

pub fn make_trade(address: &str, condition_id: &str, event_slug: &str, i: usize) -> TraderTrade {
    TraderTrade {
        proxy_wallet: Some(address.to_string()),
        side: Some(if i % 4 == 3 { "SELL" } else { "BUY" }.to_string()),
        condition_id: Some(condition_id.to_string()),
        size: Some(100.0),
        usdc_size: Some(40.0),
        price: Some(0.4),
        timestamp: Some(1_700_000_000 + (i as i64) * 3_600),
        event_slug: Some(event_slug.to_string()),
        name: Some(format!("user-{}", &address[2..])),
        ..Default::default()
    }
}

pub fn make_position(
    address: &str,
    condition_id: &str,
    event_slug: &str,
    pnl: f64,
) -> TraderPosition {
    TraderPosition {
        proxy_wallet: Some(address.to_string()),
        condition_id: Some(condition_id.to_string()),
        event_slug: Some(event_slug.to_string()),
        cash_pnl: Some(pnl),
        ..Default::default()
    }
}

/// Defaults without pauses or retries
pub fn test_config() -> ScanConfig {
    ScanConfig {
        page_delay: Duration::ZERO,
        request_delay: Duration::ZERO,
        retry: RetryPolicy::immediate(1),
        ..Default::default()
    }
}
