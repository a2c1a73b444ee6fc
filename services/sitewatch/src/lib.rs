//! Sitewatch - HTTP endpoint monitor with debounced webhook alerts
//!
//! Probes configured endpoints, keeps an append-only availability log per
//! target and sends webhook alerts on outages and recoveries.

pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod http_probe;
pub mod io;
pub mod monitor;
pub mod notifier;
pub mod runner;
pub mod webhook;

pub use config::{load_config, Config};
pub use error::{Result, SitewatchError};

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::history::HistoryStore;
use crate::http_probe::HttpProbe;
use crate::io::ReqwestHttpClient;
use crate::runner::{RunSummary, Runner};
use crate::webhook::WebhookNotifier;

/// Build a runner with the production HTTP stack for `config`
pub fn build_runner(config: &Config) -> Result<Runner> {
    config.validate()?;

    let probe_http: Arc<dyn io::HttpClient> =
        Arc::new(ReqwestHttpClient::new(&config.probe.http_settings())?);
    let notify_http: Arc<dyn io::HttpClient> =
        Arc::new(ReqwestHttpClient::new(&config.notify.http_settings())?);

    let probe = Arc::new(HttpProbe::new(&config.probe, probe_http));
    let notifier = Arc::new(WebhookNotifier::new(notify_http));
    let store = HistoryStore::new(&config.log_dir, config.history_scan_lines);

    Ok(Runner::new(config.targets.clone(), probe, notifier, store)
        .with_concurrency(config.concurrency))
}

/// Run the monitor once, or every `watch` interval until Ctrl-C
pub async fn run(config: Config, watch: Option<Duration>) -> Result<RunSummary> {
    let runner = build_runner(&config)?;
    tracing::info!(
        "Configured monitors: {} (logs in {:?})",
        runner.targets().len(),
        config.log_dir
    );

    let Some(interval) = watch else {
        let summary = runner.run_once().await;
        runner::log_summary(&summary);
        return Ok(summary);
    };

    let cancel = CancellationToken::new();
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Shutdown signal received"),
            Err(e) => tracing::error!("Failed to listen for ctrl-c: {}", e),
        }
        cancel_for_signal.cancel();
    });

    tracing::info!("Watching every {:?}", interval);
    let summary = runner.watch(interval, cancel).await;
    tracing::info!("Sitewatch stopped");
    Ok(summary)
}
