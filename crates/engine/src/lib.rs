//! Trader Scan Engine: two-phase discovery of Polymarket traders
//!
//! Provides:
//! - Polymarket data/Gamma API client with retry and error classification
//! - Quick scan: parallel basic stats for many wallets
//! - Deep analysis: categories, behavioural metrics and badges for promising ones
//! - Threshold filter and CSV export by category

pub mod api;
pub mod badges;
pub mod categories;
pub mod config;
pub mod deep_analysis;
pub mod error;
pub mod filter;
pub mod metrics;
pub mod quick_scan;

// Re-exports for convenience
pub use api::{ApiError, MarketData, PolymarketClient};
pub use config::{ScanConfig, TraderFeed};
pub use deep_analysis::{run_deep_analysis, DeepAnalysisSummary};
pub use error::{ScanError, ScanResult};
pub use filter::{ledger_stats, LedgerStats, Thresholds};
pub use quick_scan::{run_quick_scan, QuickScanSummary};
