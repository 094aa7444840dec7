//! Behavioural metrics computed from a trader's trades and positions

use crate::api::{TraderPosition, TraderTrade};
use crate::badges::entry_prices;
use crate::categories::Category;
use chrono::{DateTime, NaiveDate};
use persistence::{CategoryStats, TimingStats};
use std::collections::{BTreeMap, HashMap, HashSet};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Metrics the deep analysis adds on top of the quick stats
#[derive(Debug, Clone, PartialEq)]
pub struct TraderMetrics {
    pub unique_markets: usize,
    pub both_sides_ratio: f64,
    pub avg_entry_price: f64,
    pub max_drawdown: f64,
    pub timing: TimingStats,
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

pub fn compute_metrics(
    trades: &[TraderTrade],
    positions: &[TraderPosition],
    late_entry_hours: f64,
) -> TraderMetrics {
    let unique_markets = trades
        .iter()
        .filter_map(|t| t.condition_id.as_deref())
        .filter(|cid| !cid.is_empty())
        .collect::<HashSet<_>>()
        .len();

    let prices = entry_prices(trades);
    let avg_entry_price = if prices.is_empty() {
        0.5
    } else {
        prices.iter().sum::<f64>() / prices.len() as f64
    };

    TraderMetrics {
        unique_markets,
        both_sides_ratio: round_to(both_sides_ratio(trades), 3),
        avg_entry_price: round_to(avg_entry_price, 3),
        max_drawdown: round_to(max_drawdown(positions), 2),
        timing: compute_timing(trades, positions, late_entry_hours),
    }
}

/// Share of traded markets where the trader was on both BUY and SELL
pub fn both_sides_ratio(trades: &[TraderTrade]) -> f64 {
    let mut sides_by_market: HashMap<&str, HashSet<&str>> = HashMap::new();
    for t in trades {
        if let (Some(cid), Some(side)) = (t.condition_id.as_deref(), t.side.as_deref()) {
            if !cid.is_empty() && !side.is_empty() {
                sides_by_market.entry(cid).or_default().insert(side);
            }
        }
    }

    if sides_by_market.is_empty() {
        return 0.0;
    }
    let both = sides_by_market.values().filter(|s| s.len() > 1).count();
    both as f64 / sides_by_market.len() as f64
}

/// Peak-to-trough of cumulative position PnL, positions taken worst first
pub fn max_drawdown(positions: &[TraderPosition]) -> f64 {
    let mut pnls: Vec<f64> = positions.iter().map(|p| p.cash_pnl.unwrap_or(0.0)).collect();
    pnls.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mut cumulative = 0.0;
    let mut peak = 0.0f64;
    let mut drawdown = 0.0f64;
    for pnl in pnls {
        cumulative += pnl;
        peak = peak.max(cumulative);
        drawdown = drawdown.max(peak - cumulative);
    }
    drawdown
}

pub fn compute_timing(
    trades: &[TraderTrade],
    positions: &[TraderPosition],
    late_entry_hours: f64,
) -> TimingStats {
    let timestamps: Vec<i64> = trades.iter().filter_map(|t| t.timestamp).collect();

    let active_days = match (timestamps.iter().min(), timestamps.iter().max()) {
        (Some(min), Some(max)) if timestamps.len() >= 2 => (max - min) as f64 / SECONDS_PER_DAY,
        _ => 0.0,
    };
    let trades_per_day = if active_days >= 1.0 {
        trades.len() as f64 / active_days
    } else {
        trades.len() as f64
    };

    // market close per condition id, from the positions' end dates
    let closes: HashMap<&str, i64> = positions
        .iter()
        .filter_map(|p| {
            let cid = p.condition_id.as_deref()?;
            let close = parse_end_date(p.end_date.as_deref()?)?;
            Some((cid, close))
        })
        .collect();

    let hours_before_close: Vec<f64> = trades
        .iter()
        .filter_map(|t| {
            let close = closes.get(t.condition_id.as_deref()?)?;
            let hours = (close - t.timestamp?) as f64 / 3600.0;
            (hours >= 0.0).then_some(hours)
        })
        .collect();

    let (avg_hours_before_close, late_entry_ratio) = if hours_before_close.is_empty() {
        (None, None)
    } else {
        let n = hours_before_close.len() as f64;
        let late = hours_before_close
            .iter()
            .filter(|h| **h <= late_entry_hours)
            .count();
        (
            Some(round_to(hours_before_close.iter().sum::<f64>() / n, 1)),
            Some(round_to(late as f64 / n, 3)),
        )
    };

    TimingStats {
        active_days: round_to(active_days, 2),
        trades_per_day: round_to(trades_per_day, 2),
        cluster_ratio: round_to(compute_event_cluster_ratio(&timestamps, active_days), 3),
        avg_hours_before_close,
        late_entry_ratio,
    }
}

/// Measure what fraction of trades occur in the densest window of 20% of the span
fn compute_event_cluster_ratio(timestamps: &[i64], total_days: f64) -> f64 {
    if timestamps.len() < 5 || total_days < 1.0 {
        return 0.0;
    }

    let window = (total_days * SECONDS_PER_DAY * 0.20) as i64;
    let mut sorted = timestamps.to_vec();
    sorted.sort_unstable();

    let mut max_in_window = 0usize;
    let mut left = 0;
    for right in 0..sorted.len() {
        while sorted[right] - sorted[left] > window {
            left += 1;
        }
        max_in_window = max_in_window.max(right - left + 1);
    }

    max_in_window as f64 / sorted.len() as f64
}

/// Market end dates arrive either as RFC 3339 or as a bare `YYYY-MM-DD`
fn parse_end_date(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()?
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
}

/// Per-category trade counts (from trades) and win/loss/PnL (from positions).
///
/// `categorize` maps (condition id, slug, event slug) to a category.
pub fn category_breakdown<F>(
    trades: &[TraderTrade],
    positions: &[TraderPosition],
    decided_margin: f64,
    categorize: F,
) -> BTreeMap<Category, CategoryStats>
where
    F: Fn(Option<&str>, Option<&str>, Option<&str>) -> Category,
{
    let mut stats: BTreeMap<Category, CategoryStats> = BTreeMap::new();

    for t in trades {
        let category = categorize(
            t.condition_id.as_deref(),
            t.slug.as_deref(),
            t.event_slug.as_deref(),
        );
        stats.entry(category).or_default().trades += 1;
    }

    for p in positions {
        let category = categorize(
            p.condition_id.as_deref(),
            p.slug.as_deref(),
            p.event_slug.as_deref(),
        );
        let pnl = p.cash_pnl.unwrap_or(0.0);
        let entry = stats.entry(category).or_default();
        entry.pnl += pnl;
        if pnl > decided_margin {
            entry.wins += 1;
        } else if pnl < -decided_margin {
            entry.losses += 1;
        }
    }

    for entry in stats.values_mut() {
        entry.pnl = round_to(entry.pnl, 2);
    }
    stats
}

/// Category with the most trades and its share of all trades
pub fn main_category(
    breakdown: &BTreeMap<Category, CategoryStats>,
    total_trades: usize,
) -> (Category, f64) {
    // BTreeMap order makes ties resolve to the earlier category
    let best = breakdown
        .iter()
        .fold(None::<(Category, u64)>, |best, (category, s)| match best {
            Some((_, n)) if n >= s.trades => best,
            _ => Some((*category, s.trades)),
        });

    match best {
        Some((category, n)) if total_trades > 0 => {
            (category, round_to(n as f64 / total_trades as f64, 3))
        }
        _ => (Category::Other, 0.0),
    }
}
