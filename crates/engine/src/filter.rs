//! Threshold filter shared by both phases, plus quick-ledger summary stats

use persistence::{QuickLedger, QuickTraderRecord};
use serde::Serialize;
use std::cmp::Ordering;

/// Inclusion thresholds; a record passes when it meets every one of them
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub min_pnl: f64,
    pub min_win_rate: f64,
    pub min_trades: u64,
}

impl Thresholds {
    /// Criteria for queueing a trader for deep analysis
    pub fn promising() -> Self {
        Self {
            min_pnl: 200.0,
            min_win_rate: 0.50,
            min_trades: 20,
        }
    }

    /// Lets every record through
    pub fn permissive() -> Self {
        Self {
            min_pnl: f64::NEG_INFINITY,
            min_win_rate: 0.0,
            min_trades: 0,
        }
    }

    /// Pure and monotonic: raising any threshold can only turn `true` into `false`
    pub fn passes(&self, record: &QuickTraderRecord) -> bool {
        record.pnl >= self.min_pnl
            && record.win_rate_or_zero() >= self.min_win_rate
            && record.trade_count >= self.min_trades
    }
}

/// Addresses passing `thresholds` that still await deep analysis, best PnL first
pub fn promising_addresses(ledger: &QuickLedger, thresholds: &Thresholds) -> Vec<String> {
    let mut hits: Vec<&QuickTraderRecord> = ledger
        .values()
        .filter(|r| !r.detailed_analysis && thresholds.passes(r))
        .collect();
    hits.sort_by(|a, b| by_pnl_desc(a.pnl, b.pnl).then_with(|| a.address.cmp(&b.address)));
    hits.into_iter().map(|r| r.address.clone()).collect()
}

pub(crate) fn by_pnl_desc(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Summary of the quick ledger, shown by the `stats` command
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerStats {
    pub total: usize,
    pub avg_pnl: f64,
    /// Mean over traders whose win rate is defined
    pub avg_win_rate: Option<f64>,
    pub detailed: usize,
    pub promising: usize,
}

pub fn ledger_stats(ledger: &QuickLedger, thresholds: &Thresholds) -> LedgerStats {
    let total = ledger.len();
    let avg_pnl = if total > 0 {
        ledger.values().map(|r| r.pnl).sum::<f64>() / total as f64
    } else {
        0.0
    };

    let rates: Vec<f64> = ledger.values().filter_map(|r| r.win_rate).collect();
    let avg_win_rate = if rates.is_empty() {
        None
    } else {
        Some(rates.iter().sum::<f64>() / rates.len() as f64)
    };

    LedgerStats {
        total,
        avg_pnl,
        avg_win_rate,
        detailed: ledger.values().filter(|r| r.detailed_analysis).count(),
        promising: ledger.values().filter(|r| thresholds.passes(r)).count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use persistence::Ledger;

    fn record(address: &str, pnl: f64, win_rate: Option<f64>, trades: u64) -> QuickTraderRecord {
        QuickTraderRecord {
            address: address.into(),
            username: address.into(),
            pnl,
            volume: 1000.0,
            trade_count: trades,
            avg_bet: 10.0,
            win_rate,
            wins: 0,
            losses: 0,
            scanned_at: Utc::now(),
            detailed_analysis: false,
        }
    }

    fn ledger(records: Vec<QuickTraderRecord>) -> QuickLedger {
        let mut ledger = Ledger::empty("unused.json");
        for r in records {
            ledger.upsert(r.address.clone(), r);
        }
        ledger
    }

    #[test]
    fn test_passes_boundaries_inclusive() {
        let t = Thresholds::promising();
        assert!(t.passes(&record("a", 200.0, Some(0.5), 20)));
        assert!(!t.passes(&record("a", 199.99, Some(0.9), 50)));
        assert!(!t.passes(&record("a", 500.0, Some(0.49), 50)));
        assert!(!t.passes(&record("a", 500.0, Some(0.9), 19)));
    }

    #[test]
    fn test_undefined_win_rate_fails_positive_threshold() {
        assert!(!Thresholds::promising().passes(&record("a", 500.0, None, 50)));
        assert!(Thresholds::permissive().passes(&record("a", -50.0, None, 0)));
    }

    #[test]
    fn test_scenario_three_traders() {
        let l = ledger(vec![
            record("0x1", 300.0, Some(0.6), 25),
            record("0x2", 50.0, Some(0.6), 10),
            record("0x3", 250.0, Some(0.6), 30),
        ]);
        let promising = promising_addresses(&l, &Thresholds::promising());
        assert_eq!(promising, vec!["0x1".to_string(), "0x3".to_string()]);
    }

    #[test]
    fn test_raising_threshold_never_grows_list() {
        let l = ledger(
            (0..40)
                .map(|i| {
                    record(
                        &format!("0x{:02}", i),
                        i as f64 * 25.0,
                        Some((i % 10) as f64 / 10.0),
                        i as u64,
                    )
                })
                .collect(),
        );

        let mut previous = usize::MAX;
        for step in 0..20 {
            let t = Thresholds {
                min_pnl: step as f64 * 50.0,
                ..Thresholds::promising()
            };
            let n = promising_addresses(&l, &t).len();
            assert!(n <= previous);
            previous = n;
        }

        let mut previous = usize::MAX;
        for step in 0..=10 {
            let t = Thresholds {
                min_win_rate: step as f64 / 10.0,
                ..Thresholds::permissive()
            };
            let n = promising_addresses(&l, &t).len();
            assert!(n <= previous);
            previous = n;
        }
    }

    #[test]
    fn test_already_analyzed_traders_are_not_promising() {
        let mut analyzed = record("0x1", 900.0, Some(0.8), 100);
        analyzed.detailed_analysis = true;
        let l = ledger(vec![analyzed, record("0x2", 400.0, Some(0.7), 40)]);

        assert_eq!(promising_addresses(&l, &Thresholds::promising()), vec!["0x2"]);
    }

    #[test]
    fn test_ledger_stats() {
        let mut analyzed = record("0x1", 300.0, Some(0.6), 25);
        analyzed.detailed_analysis = true;
        let l = ledger(vec![analyzed, record("0x2", -100.0, None, 0)]);

        let stats = ledger_stats(&l, &Thresholds::promising());
        assert_eq!(stats.total, 2);
        assert_eq!(stats.avg_pnl, 100.0);
        assert_eq!(stats.avg_win_rate, Some(0.6));
        assert_eq!(stats.detailed, 1);
        assert_eq!(stats.promising, 1);
    }

    #[test]
    fn test_ledger_stats_empty() {
        let stats = ledger_stats(&Ledger::empty("x.json"), &Thresholds::promising());
        assert_eq!(stats.total, 0);
        assert_eq!(stats.avg_pnl, 0.0);
        assert_eq!(stats.avg_win_rate, None);
    }
}
