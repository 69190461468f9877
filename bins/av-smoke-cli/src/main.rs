//! Alphavantage Smoke Test CLI
//!
//! Commands:
//! - `overview`: Company overview
//! - `quote`: Latest quote snapshot
//! - `price`: Daily price series, optionally reduced to the latest trading day
//! - `earnings` / `cash-flow` / `income`: Statements, optionally latest period
//! - `report`: Combined multi-category report for one symbol
//!
//! # Usage
//! ```bash
//! # Company overview (key from env or ~/.alphavantage)
//! ALPHAVANTAGE_API_KEY=... av_smoke overview --symbol TSLA
//!
//! # Most recent trading day only
//! av_smoke price --symbol TSLA --latest --api-key demo
//!
//! # Full fundamentals report written to a file
//! av_smoke report --symbol TSLA --out data/tsla_report.json
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

use alphavantage_adapter::{AvClient, RequestEvent, ResultRecord, QUERY_API_BASE};

#[derive(Parser)]
#[command(name = "av_smoke")]
#[command(about = "Alphavantage adapter smoke test CLI")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Endpoint override, defaults to the official query endpoint
    #[arg(long, global = true)]
    base_url: Option<String>,
}

#[derive(Args)]
struct CommonArgs {
    /// Ticker symbol, e.g. TSLA
    #[arg(long)]
    symbol: String,

    /// API key; falls back to ALPHAVANTAGE_API_KEY, then ~/.alphavantage
    #[arg(long)]
    api_key: Option<String>,

    /// Output file for the JSON result (defaults to stdout)
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Company overview
    Overview {
        #[command(flatten)]
        common: CommonArgs,
    },

    /// Latest quote snapshot
    Quote {
        #[command(flatten)]
        common: CommonArgs,
    },

    /// Daily price series
    Price {
        #[command(flatten)]
        common: CommonArgs,

        /// Reduce to the most recent trading day
        #[arg(long, default_value = "false")]
        latest: bool,

        /// outputsize parameter (compact or full)
        #[arg(long)]
        outputsize: Option<String>,
    },

    /// Earnings history
    Earnings {
        #[command(flatten)]
        common: CommonArgs,

        /// Reduce to the most recent annual and quarterly reports
        #[arg(long, default_value = "false")]
        latest: bool,
    },

    /// Cash flow statements
    CashFlow {
        #[command(flatten)]
        common: CommonArgs,

        /// Reduce to the most recent annual and quarterly reports
        #[arg(long, default_value = "false")]
        latest: bool,
    },

    /// Income statements
    Income {
        #[command(flatten)]
        common: CommonArgs,

        /// Reduce to the most recent annual and quarterly reports
        #[arg(long, default_value = "false")]
        latest: bool,
    },

    /// Combined report across all categories
    Report {
        #[command(flatten)]
        common: CommonArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt().with_env_filter(env_filter).with_target(false).init();

    let base_url = cli.base_url.as_deref().unwrap_or(QUERY_API_BASE);

    match cli.command {
        Commands::Overview { common } => {
            let (client, event) = setup(base_url, &common)?;
            let record = client.company_overview(&event).await?;
            finish_single(record, common.out).await
        }
        Commands::Quote { common } => {
            let (client, event) = setup(base_url, &common)?;
            let record = client.global_quote(&event).await?;
            finish_single(record, common.out).await
        }
        Commands::Price { common, latest, outputsize } => {
            let (client, mut event) = setup(base_url, &common)?;
            if let Some(size) = outputsize {
                event = event.with_param("outputsize", size);
            }
            let record = if latest {
                client.latest_stock_price(&event).await?
            } else {
                client.stock_price(&event).await?
            };
            finish_single(record, common.out).await
        }
        Commands::Earnings { common, latest } => {
            let (client, event) = setup(base_url, &common)?;
            let record = if latest {
                client.latest_earnings(&event).await?
            } else {
                client.earnings(&event).await?
            };
            finish_single(record, common.out).await
        }
        Commands::CashFlow { common, latest } => {
            let (client, event) = setup(base_url, &common)?;
            let record = if latest {
                client.latest_cash_flow(&event).await?
            } else {
                client.cash_flow(&event).await?
            };
            finish_single(record, common.out).await
        }
        Commands::Income { common, latest } => {
            let (client, event) = setup(base_url, &common)?;
            let record = if latest {
                client.latest_income_statement(&event).await?
            } else {
                client.income_statement(&event).await?
            };
            finish_single(record, common.out).await
        }
        Commands::Report { common } => run_report(base_url, common).await,
    }
}

/// Build the client and request for one invocation. The env var lookup lives
/// here, not in the adapter: the library only consumes keys handed to it.
fn setup(base_url: &str, common: &CommonArgs) -> Result<(AvClient, RequestEvent)> {
    let mut client =
        AvClient::with_base_url(base_url).context("failed to build Alphavantage client")?;

    let cli_key = common
        .api_key
        .clone()
        .or_else(|| std::env::var("ALPHAVANTAGE_API_KEY").ok());
    if let Some(key) = cli_key {
        client = client.api_key(key);
    }

    Ok((client, RequestEvent::new(&common.symbol)))
}

async fn finish_single(record: ResultRecord, out: Option<PathBuf>) -> Result<()> {
    info!("=== {} ===", record.category);
    info!("Symbol: {}", record.symbol);
    if record.ok {
        info!("Result: OK (HTTP {})", record.status_code.unwrap_or(0));
    } else {
        warn!(
            "Result: FAILED - {}",
            record.error_message.as_deref().unwrap_or("unknown failure")
        );
        if record.limit_reached {
            warn!("Provider rate limit reached; retry later or upgrade the key tier");
        }
    }

    emit(&record, out).await
}

async fn run_report(base_url: &str, common: CommonArgs) -> Result<()> {
    info!("=== Fundamentals Report ===");
    info!("Endpoint: {}", base_url);
    info!("Symbol: {}", common.symbol);
    info!("");

    let (client, event) = setup(base_url, &common)?;
    let report = client.fundamentals_report(&event).await?;

    info!("=== Summary ===");
    info!("Categories OK: {}/{}", report.ok_count(), report.records.len());
    for record in &report.records {
        if record.ok {
            info!("  {}: OK", record.category);
        } else {
            warn!(
                "  {}: FAILED - {}",
                record.category,
                record.error_message.as_deref().unwrap_or("unknown failure")
            );
        }
    }
    if report.records.iter().any(|r| r.limit_reached) {
        warn!("Provider rate limit reached during this report");
    }

    emit(&report, common.out).await
}

/// Write pretty JSON to `--out` (creating parent directories) or stdout.
async fn emit<T: Serialize>(value: &T, out: Option<PathBuf>) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize result")?;

    match out {
        Some(path) => {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, json)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!("Output written to: {}", path.display());
        }
        None => println!("{json}"),
    }

    Ok(())
}
