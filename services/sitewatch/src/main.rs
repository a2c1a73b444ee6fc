//! Sitewatch CLI
//!
//! Command-line interface for the endpoint monitor.

use std::path::PathBuf;

use clap::Parser;
use sitewatch::config::default_config_path;
use sitewatch::load_config;
use tracing::Level;

#[derive(Parser)]
#[command(name = "sitewatch")]
#[command(about = "HTTP endpoint monitor with debounced webhook alerts")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON, or a .env file with MONITOR_<n>_* keys)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for history logs (overrides config file)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Number of targets checked at once (overrides config file)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Keep running and re-check on this interval, e.g. "5m"
    #[arg(long)]
    watch: Option<humantime::Duration>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: Level,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    tracing::debug!(
        "Parsed command line arguments: config={:?}, log_dir={:?}, concurrency={:?}, watch={:?}",
        args.config,
        args.log_dir,
        args.concurrency,
        args.watch
    );

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => default_config_path(&std::env::current_dir()?),
    };
    tracing::debug!("Loading configuration from {:?}", config_path);
    let mut config = load_config(&config_path)?;

    if let Some(log_dir) = args.log_dir {
        config.log_dir = log_dir;
    }
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency;
    }

    tracing::info!("Starting sitewatch");
    sitewatch::run(config, args.watch.map(Into::into)).await?;

    Ok(())
}
