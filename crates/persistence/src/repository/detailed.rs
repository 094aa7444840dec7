//! Deep-analysis ledger records

use crate::export::{format_float, CsvRow};
use crate::{Ledger, QuickTraderRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-category activity of one trader
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryStats {
    pub trades: u64,
    pub wins: u64,
    pub losses: u64,
    pub pnl: f64,
}

/// When a trader bets, relative to the calendar and to market close
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimingStats {
    pub active_days: f64,
    pub trades_per_day: f64,
    /// Largest share of trades inside a window of 20% of the active span
    pub cluster_ratio: f64,
    pub avg_hours_before_close: Option<f64>,
    pub late_entry_ratio: Option<f64>,
}

/// Quick stats plus the deep-analysis breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedTraderRecord {
    #[serde(flatten)]
    pub quick: QuickTraderRecord,
    pub badges: Vec<String>,
    pub main_category: String,
    pub specialization_pct: f64,
    pub categories: BTreeMap<String, CategoryStats>,
    pub both_sides_ratio: f64,
    pub avg_entry_price: f64,
    pub max_drawdown: f64,
    pub unique_markets: u64,
    pub timing: TimingStats,
    pub analyzed_at: DateTime<Utc>,
}

pub type DetailedLedger = Ledger<DetailedTraderRecord>;

impl CsvRow for DetailedTraderRecord {
    fn header() -> &'static [&'static str] {
        &[
            "address",
            "username",
            "pnl",
            "volume",
            "trades",
            "win_rate",
            "avg_bet",
            "main_category",
            "specialization_pct",
            "badges",
            "both_sides_ratio",
            "avg_entry_price",
            "max_drawdown",
            "unique_markets",
            "avg_hours_before_close",
            "analyzed_at",
        ]
    }

    fn fields(&self) -> Vec<String> {
        let q = &self.quick;
        vec![
            q.address.clone(),
            q.username.clone(),
            format_float(q.pnl),
            format_float(q.volume),
            q.trade_count.to_string(),
            q.win_rate.map(format_float).unwrap_or_default(),
            format_float(q.avg_bet),
            self.main_category.clone(),
            format_float(self.specialization_pct),
            self.badges.join(";"),
            format_float(self.both_sides_ratio),
            format_float(self.avg_entry_price),
            format_float(self.max_drawdown),
            self.unique_markets.to_string(),
            self.timing
                .avg_hours_before_close
                .map(format_float)
                .unwrap_or_default(),
            self.analyzed_at.to_rfc3339(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DetailedTraderRecord {
        let now = Utc::now();
        DetailedTraderRecord {
            quick: QuickTraderRecord {
                address: "0xabc".into(),
                username: "whale, inc".into(),
                pnl: 1250.5,
                volume: 40000.0,
                trade_count: 80,
                avg_bet: 500.0,
                win_rate: Some(0.625),
                wins: 10,
                losses: 6,
                scanned_at: now,
                detailed_analysis: true,
            },
            badges: vec!["Contrarian".into(), "High Roller".into()],
            main_category: "Politics".into(),
            specialization_pct: 0.75,
            categories: BTreeMap::new(),
            both_sides_ratio: 0.1,
            avg_entry_price: 0.31,
            max_drawdown: 120.0,
            unique_markets: 12,
            timing: TimingStats::default(),
            analyzed_at: now,
        }
    }

    #[test]
    fn test_flattened_json_keeps_quick_fields_top_level() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["address"], "0xabc");
        assert_eq!(json["trades"], 80);
        assert_eq!(json["main_category"], "Politics");
        assert!(json.get("quick").is_none());

        let back: DetailedTraderRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back.quick.address, "0xabc");
        assert_eq!(back.badges.len(), 2);
    }

    #[test]
    fn test_csv_fields_match_header() {
        let record = sample();
        let fields = record.fields();
        assert_eq!(fields.len(), DetailedTraderRecord::header().len());
        assert_eq!(fields[9], "Contrarian;High Roller");
        assert_eq!(fields[14], "");
    }
}
