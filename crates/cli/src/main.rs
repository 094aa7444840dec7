//! Trader Scan: find consistently profitable Polymarket traders
//!
//! Usage:
//!   trader-scan quick --target-new 150 --workers 5: Parallel quick scan
//!   trader-scan deep --max-count 100: Deep analysis of promising traders
//!   trader-scan stats: Ledger summary

use clap::{Parser, Subcommand};
use engine::{
    ledger_stats, run_deep_analysis, run_quick_scan, MarketData, PolymarketClient, ScanConfig,
    TraderFeed,
};
use persistence::Store;
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "trader-scan")]
#[command(about = "Two-phase discovery of profitable Polymarket traders", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory holding the ledgers and CSV exports
    #[arg(long, global = true, env = "TRADER_SCAN_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Quick scan: basic stats for many traders, in parallel
    Quick {
        /// Number of not-yet-seen traders to scan
        #[arg(long, default_value_t = 150)]
        target_new: usize,
        /// Concurrent workers
        #[arg(short, long, default_value_t = 5)]
        workers: usize,
        /// Rescan known traders older than this many hours
        /// (overrides TRADER_SCAN_STALE_AFTER_HOURS)
        #[arg(long)]
        stale_hours: Option<u64>,
        /// Trader feed: recent or leaderboard (overrides TRADER_SCAN_FEED)
        #[arg(long)]
        feed: Option<TraderFeed>,
    },
    /// Deep analysis of promising traders, then CSV export by category
    Deep {
        /// Maximum traders to analyse this run
        #[arg(long, default_value_t = 100)]
        max_count: usize,
    },
    /// Show quick ledger statistics
    Stats,
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = if verbose {
        EnvFilter::new(
            "debug,engine=debug,persistence=debug,trader_scan=debug,hyper=info,reqwest=info",
        )
    } else {
        EnvFilter::new("info,engine=info,persistence=info,trader_scan=info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).compact())
        .with(filter)
        .init();
}

/// Load `.env` first so env-backed flags like `--data-dir` see its values
fn load_cli<I, T>(args: I) -> Cli
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    dotenvy::dotenv().ok();
    Cli::parse_from(args)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = load_cli(std::env::args_os());
    init_logging(cli.verbose);

    let store = Store::open(&cli.data_dir)?;
    let mut config = ScanConfig::from_env()?;

    match cli.command {
        Commands::Quick {
            target_new,
            workers,
            stale_hours,
            feed,
        } => {
            if let Some(hours) = stale_hours {
                config.stale_after_hours = hours;
            }
            if let Some(feed) = feed {
                config.feed = feed;
            }
            cmd_quick(&store, &config, target_new, workers).await?;
        }
        Commands::Deep { max_count } => {
            cmd_deep(&store, &config, max_count).await?;
        }
        Commands::Stats => {
            cmd_stats(&store, &config)?;
        }
    }

    Ok(())
}

// ============================================================================
// Commands
// ============================================================================

async fn cmd_quick(
    store: &Store,
    config: &ScanConfig,
    target_new: usize,
    workers: usize,
) -> anyhow::Result<()> {
    info!("Trader Scan v{} - quick scan", APP_VERSION);
    let client: Arc<dyn MarketData> = Arc::new(PolymarketClient::new(config)?);

    println!("\n=== Trader Scan v{} - Quick Scan ===", APP_VERSION);
    println!("Data dir: {}", store.dir().display());
    println!("Target: {} new traders, {} workers\n", target_new, workers);

    let summary = run_quick_scan(client, store, config, target_new, workers).await?;

    println!("\n=== Quick Scan Complete ===");
    println!("  Discovered:          {}", summary.discovered);
    println!("  Scanned:             {}", summary.scanned);
    println!("  New:                 {}", summary.new);
    println!("  Updated:             {}", summary.updated);
    println!(
        "  Failed:              {} transient, {} permanent",
        summary.transient_failures, summary.permanent_failures
    );
    println!("  Total in ledger:     {}", summary.total);
    println!("  Promising:           {}", summary.promising);
    println!("\nPromising list: {}", store.promising_path().display());
    println!("Next: trader-scan deep");

    Ok(())
}

async fn cmd_deep(store: &Store, config: &ScanConfig, max_count: usize) -> anyhow::Result<()> {
    info!("Trader Scan v{} - deep analysis", APP_VERSION);
    let client = PolymarketClient::new(config)?;

    println!("\n=== Trader Scan v{} - Deep Analysis ===", APP_VERSION);
    println!("Data dir: {}", store.dir().display());
    println!("Max traders: {}\n", max_count);

    let summary = run_deep_analysis(&client, store, config, max_count).await?;

    println!("\n=== Deep Analysis Complete ===");
    println!("  Requested:           {}", summary.requested);
    println!("  Analyzed:            {}", summary.analyzed);
    println!(
        "  Failed:              {} transient, {} permanent",
        summary.transient_failures, summary.permanent_failures
    );
    println!("  Total detailed:      {}", summary.total);
    println!("  CSV files written:   {}", summary.exported);

    Ok(())
}

fn cmd_stats(store: &Store, config: &ScanConfig) -> anyhow::Result<()> {
    let quick = store.load_quick()?;
    let detailed = store.load_detailed()?;
    let stats = ledger_stats(&quick, &config.promising);

    println!("\n=== Trader Scan v{} - Stats ===", APP_VERSION);
    println!("Data dir: {}", store.dir().display());
    println!("  Quick ledger:        {}", stats.total);
    println!("  Avg PnL:             ${:.2}", stats.avg_pnl);
    match stats.avg_win_rate {
        Some(rate) => println!("  Avg win rate:        {:.1}%", rate * 100.0),
        None => println!("  Avg win rate:        n/a"),
    }
    println!("  Promising:           {}", stats.promising);
    println!("  Flagged analysed:    {}", stats.detailed);
    println!("  Detailed ledger:     {}", detailed.len());

    Ok(())
}
