//! Deep Analysis: sequential, rich stats for promising traders
//!
//! Works through the promising list one trader at a time, refreshes the quick
//! stats from a larger position window, derives categories, behavioural
//! metrics and badges, then exports the detailed ledger to CSV.

use crate::api::{ApiError, MarketData, TraderPosition, TraderTrade};
use crate::badges::assign_badges;
use crate::categories::{categorize_market, slug_tokens, Category};
use crate::config::ScanConfig;
use crate::error::ScanResult;
use crate::filter::{by_pnl_desc, Thresholds};
use crate::metrics::{category_breakdown, compute_metrics, main_category};
use crate::quick_scan::aggregate_quick_stats;
use chrono::{DateTime, Utc};
use persistence::export::write_csv;
use persistence::{DetailedLedger, DetailedTraderRecord, QuickLedger, Store};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

pub const ALL_TRADERS_EXPORT: &str = "traders_detailed_all.csv";

/// Counters reported at the end of a deep analysis run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeepAnalysisSummary {
    /// Addresses selected for analysis
    pub requested: usize,
    pub analyzed: usize,
    pub transient_failures: usize,
    pub permanent_failures: usize,
    /// Detailed ledger size after the run
    pub total: usize,
    /// CSV files written
    pub exported: usize,
}

// ---------------------------------------------------------------------------
// Market categorisation
// ---------------------------------------------------------------------------

/// Gamma tags per condition id, kept for the whole run
#[derive(Debug, Default)]
pub struct MarketCategorizer {
    tags: HashMap<String, Vec<String>>,
}

impl MarketCategorizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up tags for markets not seen yet, at most `limit` lookups.
    /// A failed lookup caches no tags for that market.
    pub async fn prefetch(
        &mut self,
        source: &dyn MarketData,
        trades: &[TraderTrade],
        positions: &[TraderPosition],
        limit: usize,
    ) {
        let mut lookups = 0usize;
        let condition_ids = trades
            .iter()
            .filter_map(|t| t.condition_id.as_deref())
            .chain(positions.iter().filter_map(|p| p.condition_id.as_deref()));

        for cid in condition_ids {
            if lookups >= limit {
                debug!(limit, "Market lookup limit reached, using slug keywords");
                break;
            }
            if cid.is_empty() || self.tags.contains_key(cid) {
                continue;
            }
            lookups += 1;

            let tags = match source.market_tags(cid).await {
                Ok(tags) => tags,
                Err(e) => {
                    debug!(condition_id = cid, error = %e, "Market tag lookup failed");
                    Vec::new()
                }
            };
            self.tags.insert(cid.to_string(), tags);
        }
    }

    /// Cached Gamma tags plus slug tokens
    pub fn categorize(
        &self,
        condition_id: Option<&str>,
        slug: Option<&str>,
        event_slug: Option<&str>,
    ) -> Category {
        let mut tags: Vec<String> = condition_id
            .and_then(|cid| self.tags.get(cid))
            .cloned()
            .unwrap_or_default();
        tags.extend(event_slug.into_iter().chain(slug).flat_map(slug_tokens));
        categorize_market(&tags)
    }
}

// ---------------------------------------------------------------------------
// Per-trader analysis
// ---------------------------------------------------------------------------

/// Build a detailed record from a trader's raw data. Pure apart from `categorizer` lookups.
pub fn build_detailed_record(
    address: &str,
    trades: &[TraderTrade],
    positions: &[TraderPosition],
    categorizer: &MarketCategorizer,
    config: &ScanConfig,
    now: DateTime<Utc>,
) -> DetailedTraderRecord {
    let mut quick = aggregate_quick_stats(address, trades, positions, config.decided_margin, now);
    quick.detailed_analysis = true;

    let breakdown = category_breakdown(
        trades,
        positions,
        config.decided_margin,
        |cid, slug, event| categorizer.categorize(cid, slug, event),
    );
    let (main, specialization_pct) = main_category(&breakdown, trades.len());
    let metrics = compute_metrics(trades, positions, config.late_entry_hours);
    let badges = assign_badges(trades, positions, &config.badges);

    DetailedTraderRecord {
        quick,
        badges: badges.iter().map(|b| b.label().to_string()).collect(),
        main_category: main.label().to_string(),
        specialization_pct,
        categories: breakdown
            .into_iter()
            .map(|(category, stats)| (category.label().to_string(), stats))
            .collect(),
        both_sides_ratio: metrics.both_sides_ratio,
        avg_entry_price: metrics.avg_entry_price,
        max_drawdown: metrics.max_drawdown,
        unique_markets: metrics.unique_markets as u64,
        timing: metrics.timing,
        analyzed_at: now,
    }
}

pub async fn analyze_trader(
    source: &dyn MarketData,
    address: &str,
    config: &ScanConfig,
    categorizer: &mut MarketCategorizer,
) -> Result<DetailedTraderRecord, ApiError> {
    let trades = source
        .trader_trades(address, config.trade_history_limit)
        .await?;
    if trades.is_empty() {
        return Err(ApiError::Permanent(format!("{} has no trade history", address)));
    }
    let positions = source
        .trader_positions(address, config.deep_position_limit)
        .await?;

    categorizer
        .prefetch(source, &trades, &positions, config.market_lookup_limit)
        .await;

    Ok(build_detailed_record(
        address,
        &trades,
        &positions,
        categorizer,
        config,
        Utc::now(),
    ))
}

// ---------------------------------------------------------------------------
// Selection and export
// ---------------------------------------------------------------------------

/// Addresses to analyse: the saved promising list minus already-analysed
/// traders, or a fresh filter of the quick ledger when no list exists
pub fn select_for_analysis(
    promising: Option<Vec<String>>,
    quick: &QuickLedger,
    detailed: &DetailedLedger,
    thresholds: &Thresholds,
    max_count: usize,
) -> Vec<String> {
    match promising {
        Some(list) => list
            .into_iter()
            .filter(|a| !quick.get(a).map(|r| r.detailed_analysis).unwrap_or(false))
            .take(max_count)
            .collect(),
        None => {
            info!("No promising list found, filtering the quick ledger");
            let mut hits: Vec<_> = quick
                .values()
                .filter(|r| !detailed.contains(&r.address) && thresholds.passes(r))
                .collect();
            hits.sort_by(|a, b| by_pnl_desc(a.pnl, b.pnl).then_with(|| a.address.cmp(&b.address)));
            hits.into_iter()
                .take(max_count)
                .map(|r| r.address.clone())
                .collect()
        }
    }
}

/// Write the all-traders CSV and one CSV per main category. Returns files written.
pub fn export_by_category(
    store: &Store,
    detailed: &DetailedLedger,
    thresholds: &Thresholds,
    top_n: usize,
) -> ScanResult<usize> {
    let mut rows: Vec<&DetailedTraderRecord> = detailed
        .values()
        .filter(|r| thresholds.passes(&r.quick))
        .collect();
    rows.sort_by(|a, b| {
        by_pnl_desc(a.quick.pnl, b.quick.pnl).then_with(|| a.quick.address.cmp(&b.quick.address))
    });

    write_csv(&store.export_path(ALL_TRADERS_EXPORT), &rows)?;
    let mut written = 1;

    let mut by_category: BTreeMap<Category, Vec<&DetailedTraderRecord>> = BTreeMap::new();
    for row in rows.iter().copied() {
        let category = Category::from_label(&row.main_category).unwrap_or(Category::Other);
        by_category.entry(category).or_default().push(row);
    }

    for (category, mut records) in by_category {
        // already in PnL order
        records.truncate(top_n);
        write_csv(&store.export_path(&category.export_file_name()), &records)?;
        written += 1;
    }

    Ok(written)
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub async fn run_deep_analysis(
    source: &dyn MarketData,
    store: &Store,
    config: &ScanConfig,
    max_count: usize,
) -> ScanResult<DeepAnalysisSummary> {
    let mut quick = store.load_quick()?;
    let mut detailed = store.load_detailed()?;

    let selected = select_for_analysis(
        store.load_promising()?,
        &quick,
        &detailed,
        &config.promising,
        max_count,
    );
    info!(count = selected.len(), max_count, "Starting deep analysis");

    let mut summary = DeepAnalysisSummary {
        requested: selected.len(),
        ..Default::default()
    };
    let mut categorizer = MarketCategorizer::new();

    for (i, address) in selected.iter().enumerate() {
        if i > 0 && !config.request_delay.is_zero() {
            tokio::time::sleep(config.request_delay).await;
        }

        match analyze_trader(source, address, config, &mut categorizer).await {
            Ok(record) => {
                info!(
                    address = %address,
                    pnl = record.quick.pnl,
                    main_category = %record.main_category,
                    badges = ?record.badges,
                    "Trader analyzed"
                );
                quick.upsert(address.clone(), record.quick.clone());
                detailed.upsert(address.clone(), record);
                summary.analyzed += 1;
            }
            Err(e) => {
                if e.is_transient() {
                    summary.transient_failures += 1;
                } else {
                    summary.permanent_failures += 1;
                }
                warn!(address = %address, error = %e, "Skipping trader");
            }
        }

        if (i + 1) % 10 == 0 {
            info!(completed = i + 1, total = selected.len(), "Deep analysis progress");
        }
    }

    detailed.save()?;
    quick.save()?;

    summary.total = detailed.len();
    summary.exported = export_by_category(store, &detailed, &config.export, config.export_top_n)?;

    info!(
        analyzed = summary.analyzed,
        transient_failures = summary.transient_failures,
        permanent_failures = summary.permanent_failures,
        total = summary.total,
        exported = summary.exported,
        "Deep analysis finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use persistence::{Ledger, QuickTraderRecord};

    fn quick_record(address: &str, pnl: f64, detailed_analysis: bool) -> QuickTraderRecord {
        QuickTraderRecord {
            address: address.into(),
            username: address.into(),
            pnl,
            volume: 5000.0,
            trade_count: 40,
            avg_bet: 125.0,
            win_rate: Some(0.6),
            wins: 6,
            losses: 4,
            scanned_at: Utc::now(),
            detailed_analysis,
        }
    }

    fn trade(cid: &str, event_slug: &str, side: &str, price: f64) -> TraderTrade {
        TraderTrade {
            condition_id: Some(cid.into()),
            event_slug: Some(event_slug.into()),
            side: Some(side.into()),
            price: Some(price),
            usdc_size: Some(100.0),
            timestamp: Some(1_700_000_000),
            ..Default::default()
        }
    }

    #[test]
    fn test_select_drops_analysed_traders() {
        let mut quick: QuickLedger = Ledger::empty("q.json");
        quick.upsert("0xa", quick_record("0xa", 500.0, true));
        quick.upsert("0xb", quick_record("0xb", 400.0, false));
        let detailed: DetailedLedger = Ledger::empty("d.json");

        let list = Some(vec!["0xa".to_string(), "0xb".to_string(), "0xc".to_string()]);
        let picked = select_for_analysis(list, &quick, &detailed, &Thresholds::promising(), 10);
        assert_eq!(picked, vec!["0xb", "0xc"]);

        let list = Some(vec!["0xb".to_string(), "0xc".to_string()]);
        let picked = select_for_analysis(list, &quick, &detailed, &Thresholds::promising(), 1);
        assert_eq!(picked, vec!["0xb"]);
    }

    #[test]
    fn test_select_falls_back_to_filter() {
        let mut quick: QuickLedger = Ledger::empty("q.json");
        quick.upsert("0xlow", quick_record("0xlow", 50.0, false));
        quick.upsert("0xmid", quick_record("0xmid", 300.0, false));
        quick.upsert("0xtop", quick_record("0xtop", 900.0, false));
        quick.upsert("0xdone", quick_record("0xdone", 1000.0, false));

        let mut detailed: DetailedLedger = Ledger::empty("d.json");
        let config = ScanConfig::default();
        let categorizer = MarketCategorizer::new();
        detailed.upsert(
            "0xdone",
            build_detailed_record("0xdone", &[], &[], &categorizer, &config, Utc::now()),
        );

        let picked = select_for_analysis(None, &quick, &detailed, &Thresholds::promising(), 10);
        assert_eq!(picked, vec!["0xtop", "0xmid"]);
    }

    #[test]
    fn test_categorizer_uses_cached_tags_then_slug() {
        let mut categorizer = MarketCategorizer::new();
        categorizer
            .tags
            .insert("c1".into(), vec!["Crypto".into(), "Bitcoin".into()]);

        assert_eq!(categorizer.categorize(Some("c1"), None, None), Category::Crypto);
        assert_eq!(
            categorizer.categorize(Some("c2"), Some("will-the-nba-finals-go-to-7"), None),
            Category::Sports
        );
        assert_eq!(categorizer.categorize(None, None, None), Category::Other);
    }

    #[test]
    fn test_build_detailed_record() {
        let trades = vec![
            trade("p1", "presidential-election-2024", "BUY", 0.3),
            trade("p1", "presidential-election-2024", "SELL", 0.6),
            trade("p2", "trump-approval", "BUY", 0.4),
            trade("s1", "nfl-week-1", "BUY", 0.7),
        ];
        let positions = vec![TraderPosition {
            condition_id: Some("p1".into()),
            event_slug: Some("presidential-election-2024".into()),
            cash_pnl: Some(250.0),
            ..Default::default()
        }];

        let record = build_detailed_record(
            "0xabc",
            &trades,
            &positions,
            &MarketCategorizer::new(),
            &ScanConfig::default(),
            Utc::now(),
        );

        assert!(record.quick.detailed_analysis);
        assert_eq!(record.quick.pnl, 250.0);
        assert_eq!(record.main_category, "Politics");
        assert_eq!(record.specialization_pct, 0.75);
        assert_eq!(record.categories["Politics"].wins, 1);
        assert_eq!(record.categories["Sports"].trades, 1);
        assert_eq!(record.unique_markets, 3);
        assert_eq!(record.avg_entry_price, 0.5);
        assert!((record.both_sides_ratio - 0.333).abs() < 1e-9);
    }
}
