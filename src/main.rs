mod config;
mod error;
mod extract;
mod fetcher;
mod monitor;
mod notifier;
mod state;
mod tier;
mod types;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::time::interval;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::error::Result;
use crate::monitor::Monitor;
use crate::notifier::SmtpNotifier;

#[derive(Debug, Parser)]
#[command(name = "dealwatch", about = "Product stock and price-tier monitor")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(default_value = "config.json")]
    config: PathBuf,

    /// Run a single pass and exit (for cron-style scheduling).
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let cfg = match Config::from_file(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg, cli.once).await {
        tracing::error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config, once: bool) -> Result<()> {
    info!(
        products = cfg.products.len(),
        tier1_max = cfg.tier1_max,
        tier2_max = cfg.tier2_max,
        stock_policy = %cfg.stock_policy,
        interval_minutes = cfg.check_interval_minutes,
        "Starting monitor: {} products, tiers <${}/<${}, policy {}",
        cfg.products.len(),
        cfg.tier1_max,
        cfg.tier2_max,
        cfg.stock_policy,
    );

    let notifier = SmtpNotifier::new(&cfg.email)?;
    let interval_secs = cfg.check_interval_minutes * 60;
    let monitor = Monitor::new(cfg, notifier)?;

    // Immediate first pass in both modes.
    monitor.run_pass().await;
    if once {
        return Ok(());
    }

    let mut ticker = interval(Duration::from_secs(interval_secs));
    ticker.tick().await; // consume the immediate tick — the first pass just ran

    // Passes run to completion; shutdown only lands between them.
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                monitor.run_pass().await;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received, stopping");
                break;
            }
        }
    }

    Ok(())
}
