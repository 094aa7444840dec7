//! Run configuration, read from `TRADER_SCAN_*` environment variables

use crate::api::polymarket::{DATA_API_URL, GAMMA_API_URL};
use crate::api::RetryPolicy;
use crate::badges::BadgeRules;
use crate::filter::Thresholds;
use anyhow::Context;
use std::env;
use std::str::FromStr;
use std::time::Duration;

const ENV_PREFIX: &str = "TRADER_SCAN_";

/// Where the quick scan discovers trader addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraderFeed {
    /// Wallets appearing in the platform-wide recent trades
    RecentTrades,
    /// Wallets on the PnL leaderboard
    Leaderboard,
}

impl FromStr for TraderFeed {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "recent" | "trades" | "recent-trades" => Ok(Self::RecentTrades),
            "leaderboard" => Ok(Self::Leaderboard),
            other => anyhow::bail!(
                "unknown trader feed '{}' (expected recent or leaderboard)",
                other
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub data_api_url: String,
    pub gamma_api_url: String,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,

    pub feed: TraderFeed,
    pub feed_page_size: u32,
    pub feed_max_pages: u32,
    /// Pause between feed pages
    pub page_delay: Duration,

    pub trade_history_limit: u32,
    pub quick_position_limit: u32,
    pub deep_position_limit: u32,

    /// Position PnL beyond ±margin counts as a win or a loss
    pub decided_margin: f64,
    /// Known traders are rescanned only when older than this
    pub stale_after_hours: u64,

    pub promising: Thresholds,
    pub export: Thresholds,
    pub export_top_n: usize,
    pub badges: BadgeRules,

    /// Pause between traders in the deep analysis
    pub request_delay: Duration,
    /// Gamma lookups allowed per trader before falling back to slug keywords
    pub market_lookup_limit: usize,
    /// A trade within this many hours of market close is a late entry
    pub late_entry_hours: f64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            data_api_url: DATA_API_URL.to_string(),
            gamma_api_url: GAMMA_API_URL.to_string(),
            request_timeout: Duration::from_secs(20),
            retry: RetryPolicy::default(),
            feed: TraderFeed::RecentTrades,
            feed_page_size: 500,
            feed_max_pages: 3,
            page_delay: Duration::from_millis(500),
            trade_history_limit: 500,
            quick_position_limit: 100,
            deep_position_limit: 200,
            decided_margin: 5.0,
            stale_after_hours: 0,
            promising: Thresholds::promising(),
            export: Thresholds::permissive(),
            export_top_n: 50,
            badges: BadgeRules::default(),
            request_delay: Duration::from_millis(300),
            market_lookup_limit: 25,
            late_entry_hours: 24.0,
        }
    }
}

impl ScanConfig {
    /// Defaults overridden by any `TRADER_SCAN_*` variable that is set
    pub fn from_env() -> anyhow::Result<Self> {
        let d = Self::default();

        let retry = RetryPolicy {
            max_attempts: env_or("RETRY_ATTEMPTS", d.retry.max_attempts)?,
            base_delay: Duration::from_millis(env_or(
                "RETRY_BASE_DELAY_MS",
                d.retry.base_delay.as_millis() as u64,
            )?),
            ..d.retry.clone()
        };

        Ok(Self {
            data_api_url: env_or("DATA_API_URL", d.data_api_url)?,
            gamma_api_url: env_or("GAMMA_API_URL", d.gamma_api_url)?,
            request_timeout: Duration::from_secs(env_or(
                "REQUEST_TIMEOUT_SECS",
                d.request_timeout.as_secs(),
            )?),
            retry,
            feed: env_or("FEED", d.feed)?,
            feed_page_size: env_or("FEED_PAGE_SIZE", d.feed_page_size)?,
            feed_max_pages: env_or("FEED_MAX_PAGES", d.feed_max_pages)?,
            page_delay: d.page_delay,
            trade_history_limit: d.trade_history_limit,
            quick_position_limit: d.quick_position_limit,
            deep_position_limit: d.deep_position_limit,
            decided_margin: env_or("DECIDED_MARGIN", d.decided_margin)?,
            stale_after_hours: env_or("STALE_AFTER_HOURS", d.stale_after_hours)?,
            promising: Thresholds {
                min_pnl: env_or("PROMISING_MIN_PNL", d.promising.min_pnl)?,
                min_win_rate: env_or("PROMISING_MIN_WIN_RATE", d.promising.min_win_rate)?,
                min_trades: env_or("PROMISING_MIN_TRADES", d.promising.min_trades)?,
            },
            export: Thresholds {
                min_pnl: env_or("EXPORT_MIN_PNL", d.export.min_pnl)?,
                ..d.export
            },
            export_top_n: env_or("EXPORT_TOP_N", d.export_top_n)?,
            badges: BadgeRules {
                whale_volume: env_or("WHALE_VOLUME", d.badges.whale_volume)?,
                high_roller_volume: env_or("HIGH_ROLLER_VOLUME", d.badges.high_roller_volume)?,
                contrarian_ratio: env_or("CONTRARIAN_RATIO", d.badges.contrarian_ratio)?,
                ..d.badges
            },
            request_delay: Duration::from_millis(env_or(
                "REQUEST_DELAY_MS",
                d.request_delay.as_millis() as u64,
            )?),
            market_lookup_limit: env_or("MARKET_LOOKUP_LIMIT", d.market_lookup_limit)?,
            late_entry_hours: d.late_entry_hours,
        })
    }
}

/// Parse `TRADER_SCAN_<key>` if set, else return `default`
fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let name = format!("{}{}", ENV_PREFIX, key);
    match env::var(&name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("invalid value for {}: '{}'", name, raw)),
        _ => Ok(default),
    }
}
