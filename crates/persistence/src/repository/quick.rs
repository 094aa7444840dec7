//! Quick-scan ledger records

use crate::Ledger;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Basic per-trader stats collected by the quick scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuickTraderRecord {
    pub address: String,
    pub username: String,
    pub pnl: f64,
    pub volume: f64,
    #[serde(rename = "trades")]
    pub trade_count: u64,
    pub avg_bet: f64,
    /// `None` when no position is decided (no wins and no losses)
    pub win_rate: Option<f64>,
    pub wins: u64,
    pub losses: u64,
    pub scanned_at: DateTime<Utc>,
    /// Set once the deep analysis has processed the trader since its last quick scan
    #[serde(default)]
    pub detailed_analysis: bool,
}

impl QuickTraderRecord {
    /// Win rate for threshold comparisons (undefined counts as zero)
    pub fn win_rate_or_zero(&self) -> f64 {
        self.win_rate.unwrap_or(0.0)
    }
}

pub type QuickLedger = Ledger<QuickTraderRecord>;
