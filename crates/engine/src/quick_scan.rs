//! Quick Scan: fast parallel collection of basic trader stats
//!
//! Discovers active wallets from the trader feed, fetches each one's trades and
//! positions through a bounded worker pool, and merges the aggregated records
//! into the quick ledger. Workers never touch the ledger: they send outcomes
//! over a channel to the single merging loop.

use crate::api::{ApiError, MarketData, TraderPosition, TraderTrade};
use crate::config::{ScanConfig, TraderFeed};
use crate::error::{ScanError, ScanResult};
use crate::filter::promising_addresses;
use crate::metrics::round_to;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use persistence::{QuickLedger, QuickTraderRecord, Store, UpsertOutcome};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, error, info, warn};

/// Counters reported at the end of a quick scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QuickScanSummary {
    /// Unique addresses seen in the feed
    pub discovered: usize,
    pub scanned: usize,
    pub new: usize,
    pub updated: usize,
    pub transient_failures: usize,
    pub permanent_failures: usize,
    /// Ledger size after the merge
    pub total: usize,
    pub promising: usize,
}

enum ScanOutcome {
    Scanned(QuickTraderRecord),
    Failed { address: String, error: ApiError },
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Basic stats from raw trades and positions. Pure; never divides by zero.
pub fn aggregate_quick_stats(
    address: &str,
    trades: &[TraderTrade],
    positions: &[TraderPosition],
    decided_margin: f64,
    now: DateTime<Utc>,
) -> QuickTraderRecord {
    let trade_count = trades.len();
    let volume: f64 = trades.iter().map(TraderTrade::notional).sum();
    let avg_bet = if trade_count > 0 {
        volume / trade_count as f64
    } else {
        0.0
    };

    let pnl: f64 = positions.iter().map(|p| p.cash_pnl.unwrap_or(0.0)).sum();
    let wins = positions
        .iter()
        .filter(|p| p.cash_pnl.unwrap_or(0.0) > decided_margin)
        .count();
    let losses = positions
        .iter()
        .filter(|p| p.cash_pnl.unwrap_or(0.0) < -decided_margin)
        .count();
    let win_rate = if wins + losses > 0 {
        Some(round_to(wins as f64 / (wins + losses) as f64, 3))
    } else {
        None
    };

    QuickTraderRecord {
        address: address.to_string(),
        username: display_name(trades),
        pnl: round_to(pnl, 2),
        volume: round_to(volume, 2),
        trade_count: trade_count as u64,
        avg_bet: round_to(avg_bet, 2),
        win_rate,
        wins: wins as u64,
        losses: losses as u64,
        scanned_at: now,
        detailed_analysis: false,
    }
}

fn display_name(trades: &[TraderTrade]) -> String {
    let first = match trades.first() {
        Some(t) => t,
        None => return "Anonymous".to_string(),
    };
    [first.name.as_deref(), first.pseudonym.as_deref()]
        .into_iter()
        .flatten()
        .find(|n| !n.trim().is_empty())
        .unwrap_or("Anonymous")
        .to_string()
}

/// Fetch one trader and aggregate; an empty trade history is a permanent skip
pub async fn quick_analyze_trader(
    source: &dyn MarketData,
    address: &str,
    trade_limit: u32,
    position_limit: u32,
    decided_margin: f64,
) -> Result<QuickTraderRecord, ApiError> {
    let trades = source.trader_trades(address, trade_limit).await?;
    if trades.is_empty() {
        return Err(ApiError::Permanent(format!("{} has no trade history", address)));
    }
    let positions = source.trader_positions(address, position_limit).await?;

    Ok(aggregate_quick_stats(
        address,
        &trades,
        &positions,
        decided_margin,
        Utc::now(),
    ))
}

// ---------------------------------------------------------------------------
// Candidate selection
// ---------------------------------------------------------------------------

/// Page through the trader feed collecting unique wallets, in feed order.
///
/// Stops when `target_new` unseen wallets are known, a short page signals the
/// end of the feed, a page fails, or `feed_max_pages` is reached.
pub async fn discover_addresses(
    source: &dyn MarketData,
    config: &ScanConfig,
    target_new: usize,
    ledger: &QuickLedger,
) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut addresses: Vec<String> = Vec::new();
    let page_size = config.feed_page_size.max(1);

    for page in 0..config.feed_max_pages {
        let offset = page.saturating_mul(page_size);
        let fetched: Result<(Vec<String>, usize), ApiError> = match config.feed {
            TraderFeed::RecentTrades => source.recent_trades(page_size, offset).await.map(|t| {
                let n = t.len();
                (t.into_iter().filter_map(|t| t.proxy_wallet).collect(), n)
            }),
            TraderFeed::Leaderboard => source.leaderboard(page_size, offset).await.map(|e| {
                let n = e.len();
                (e.into_iter().filter_map(|e| e.proxy_wallet).collect(), n)
            }),
        };

        let (wallets, page_len) = match fetched {
            Ok(v) => v,
            Err(e) => {
                warn!(page, error = %e, "Failed to fetch trader feed page, stopping discovery");
                break;
            }
        };

        for wallet in wallets {
            if !wallet.is_empty() && seen.insert(wallet.clone()) {
                addresses.push(wallet);
            }
        }
        debug!(page, page_len, unique = addresses.len(), "Feed page fetched");

        let unseen = addresses.iter().filter(|a| !ledger.contains(a)).count();
        if page_len < page_size as usize || unseen >= target_new {
            break;
        }
        if page + 1 < config.feed_max_pages {
            tokio::time::sleep(config.page_delay).await;
        }
    }

    addresses
}

/// New wallets first; top up with known wallets due for a rescan, oldest first
pub fn select_candidates(
    discovered: &[String],
    ledger: &QuickLedger,
    target_new: usize,
    stale_after_hours: u64,
    now: DateTime<Utc>,
) -> Vec<String> {
    let mut selected: Vec<String> = discovered
        .iter()
        .filter(|a| !ledger.contains(a))
        .take(target_new)
        .cloned()
        .collect();

    if selected.len() < target_new {
        // a staleness window beyond chrono's range means nothing is stale
        let cutoff = i64::try_from(stale_after_hours)
            .ok()
            .and_then(ChronoDuration::try_hours)
            .and_then(|age| now.checked_sub_signed(age));
        let mut stale: Vec<&QuickTraderRecord> = discovered
            .iter()
            .filter_map(|a| ledger.get(a))
            .filter(|r| cutoff.is_some_and(|c| r.scanned_at <= c))
            .collect();
        stale.sort_by_key(|r| r.scanned_at);

        let room = target_new - selected.len();
        selected.extend(stale.into_iter().take(room).map(|r| r.address.clone()));
    }

    selected
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Run one quick scan: discover, fetch in parallel, merge, save, export the promising list
pub async fn run_quick_scan(
    source: Arc<dyn MarketData>,
    store: &Store,
    config: &ScanConfig,
    target_new: usize,
    max_workers: usize,
) -> ScanResult<QuickScanSummary> {
    if max_workers == 0 {
        return Err(ScanError::Config("max_workers must be at least 1".into()));
    }
    if max_workers > Semaphore::MAX_PERMITS {
        return Err(ScanError::Config(format!(
            "max_workers must be at most {}",
            Semaphore::MAX_PERMITS
        )));
    }

    info!(target_new, max_workers, feed = ?config.feed, "Starting quick scan");
    let mut ledger = store.load_quick()?;

    // Step 1: discover wallets
    let discovered = discover_addresses(source.as_ref(), config, target_new, &ledger).await;
    let to_scan = select_candidates(
        &discovered,
        &ledger,
        target_new,
        config.stale_after_hours,
        Utc::now(),
    );
    let new_candidates = to_scan.iter().filter(|a| !ledger.contains(a)).count();
    info!(
        discovered = discovered.len(),
        new = new_candidates,
        rescans = to_scan.len() - new_candidates,
        "Selected traders to scan"
    );

    // Step 2: bounded worker pool; outcomes flow to this task only
    let started = Instant::now();
    let semaphore = Arc::new(Semaphore::new(max_workers));
    let capacity = max_workers.saturating_mul(2).min(Semaphore::MAX_PERMITS);
    let (tx, mut rx) = mpsc::channel::<ScanOutcome>(capacity);
    let mut handles = Vec::with_capacity(to_scan.len());

    for address in to_scan {
        let semaphore = semaphore.clone();
        let source = source.clone();
        let tx = tx.clone();
        let trade_limit = config.trade_history_limit;
        let position_limit = config.quick_position_limit;
        let margin = config.decided_margin;

        handles.push(tokio::spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(p) => p,
                Err(_) => return,
            };
            let outcome = match quick_analyze_trader(
                source.as_ref(),
                &address,
                trade_limit,
                position_limit,
                margin,
            )
            .await
            {
                Ok(record) => ScanOutcome::Scanned(record),
                Err(error) => ScanOutcome::Failed { address, error },
            };
            // receiver only goes away if the merge loop is gone
            let _ = tx.send(outcome).await;
        }));
    }
    drop(tx);

    // Step 3: merge
    let total_tasks = handles.len();
    let mut summary = QuickScanSummary {
        discovered: discovered.len(),
        ..Default::default()
    };
    let mut completed = 0usize;

    while let Some(outcome) = rx.recv().await {
        completed += 1;
        if completed % 10 == 0 {
            info!(completed, total = total_tasks, "Quick scan progress");
        }

        match outcome {
            ScanOutcome::Scanned(record) => {
                summary.scanned += 1;
                match ledger.upsert(record.address.clone(), record) {
                    UpsertOutcome::Inserted => summary.new += 1,
                    UpsertOutcome::Updated => summary.updated += 1,
                }
            }
            ScanOutcome::Failed { address, error } => {
                if error.is_transient() {
                    summary.transient_failures += 1;
                } else {
                    summary.permanent_failures += 1;
                }
                warn!(address = %address, error = %error, "Skipping trader");
            }
        }
    }

    for handle in handles {
        if let Err(e) = handle.await {
            error!(error = %e, "Scan worker died before reporting");
            summary.permanent_failures += 1;
        }
    }

    info!(
        scanned = summary.scanned,
        elapsed_secs = round_to(started.elapsed().as_secs_f64(), 1),
        "Parallel scan complete"
    );

    // Step 4: persist
    ledger.save()?;
    let promising = promising_addresses(&ledger, &config.promising);
    store.save_promising(&promising)?;

    summary.total = ledger.len();
    summary.promising = promising.len();
    info!(
        new = summary.new,
        updated = summary.updated,
        transient_failures = summary.transient_failures,
        permanent_failures = summary.permanent_failures,
        total = summary.total,
        promising = summary.promising,
        "Quick scan finished"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use persistence::Ledger;

    fn trade(usdc: f64, name: Option<&str>, pseudonym: Option<&str>) -> TraderTrade {
        TraderTrade {
            usdc_size: Some(usdc),
            name: name.map(Into::into),
            pseudonym: pseudonym.map(Into::into),
            ..Default::default()
        }
    }

    fn position(pnl: f64) -> TraderPosition {
        TraderPosition {
            cash_pnl: Some(pnl),
            ..Default::default()
        }
    }

    fn known(address: &str, scanned_at: DateTime<Utc>) -> QuickTraderRecord {
        QuickTraderRecord {
            scanned_at,
            ..aggregate_quick_stats(address, &[], &[], 5.0, scanned_at)
        }
    }

    #[test]
    fn test_aggregate_zero_trades_has_undefined_win_rate() {
        let record = aggregate_quick_stats("0xabc", &[], &[], 5.0, Utc::now());
        assert_eq!(record.trade_count, 0);
        assert_eq!(record.win_rate, None);
        assert_eq!(record.avg_bet, 0.0);
        assert_eq!(record.username, "Anonymous");
    }

    #[test]
    fn test_aggregate_basic_stats() {
        let trades = vec![
            trade(100.0, Some(""), Some("Quiet-Fox")),
            trade(50.0, None, None),
            trade(0.0, None, None),
        ];
        let positions = vec![position(300.0), position(-40.0), position(2.0), position(10.0)];

        let record = aggregate_quick_stats("0xabc", &trades, &positions, 5.0, Utc::now());
        assert_eq!(record.trade_count, 3);
        assert_eq!(record.volume, 150.0);
        assert_eq!(record.avg_bet, 50.0);
        assert_eq!(record.pnl, 272.0);
        assert_eq!(record.wins, 2);
        assert_eq!(record.losses, 1);
        assert_eq!(record.win_rate, Some(0.667));
        assert_eq!(record.username, "Quiet-Fox");
        assert!(!record.detailed_analysis);
    }

    #[test]
    fn test_win_rate_bounded() {
        for (w, l) in [(0usize, 3usize), (3, 0), (1, 1), (7, 2)] {
            let mut positions: Vec<_> = (0..w).map(|_| position(50.0)).collect();
            positions.extend((0..l).map(|_| position(-50.0)));
            let trades = [trade(1.0, None, None)];
            let record = aggregate_quick_stats("0x1", &trades, &positions, 5.0, Utc::now());
            let rate = record.win_rate.unwrap();
            assert!((0.0..=1.0).contains(&rate));
        }
    }

    #[test]
    fn test_select_prefers_new_then_oldest_stale() {
        let now = Utc::now();
        let mut ledger: QuickLedger = Ledger::empty("unused.json");
        ledger.upsert("0xold", known("0xold", now - ChronoDuration::hours(48)));
        ledger.upsert("0xmid", known("0xmid", now - ChronoDuration::hours(30)));
        ledger.upsert("0xfresh", known("0xfresh", now - ChronoDuration::hours(1)));

        let discovered: Vec<String> = ["0xfresh", "0xmid", "0xnew1", "0xold", "0xnew2"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let picked = select_candidates(&discovered, &ledger, 2, 24, now);
        assert_eq!(picked, vec!["0xnew1", "0xnew2"]);

        let picked = select_candidates(&discovered, &ledger, 4, 24, now);
        assert_eq!(picked, vec!["0xnew1", "0xnew2", "0xold", "0xmid"]);

        // fresh records are not rescanned
        let picked = select_candidates(&discovered, &ledger, 10, 24, now);
        assert_eq!(picked.len(), 4);

        // zero staleness rescans everything known
        let picked = select_candidates(&discovered, &ledger, 10, 0, now);
        assert_eq!(picked.len(), 5);
    }

    #[test]
    fn test_huge_staleness_window_rescans_nothing() {
        let now = Utc::now();
        let mut ledger: QuickLedger = Ledger::empty("unused.json");
        ledger.upsert("0xold", known("0xold", now - ChronoDuration::days(3650)));
        let discovered = vec!["0xnew".to_string(), "0xold".to_string()];

        for hours in [99_999_999_999, i64::MAX as u64, u64::MAX] {
            let picked = select_candidates(&discovered, &ledger, 5, hours, now);
            assert_eq!(picked, vec!["0xnew"]);
        }
    }
}
