//! Runner: probes every target once and applies each decision

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::engine::{decide, Decision, DecisionReason};
use crate::history::{HistoryRecord, HistoryStore, LogEntry};
use crate::monitor::{HealthStatus, MonitorTarget, Probe};
use crate::notifier::{Notification, Notifier};

/// Source of the current time
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// What happened to the alert for one target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    NotAttempted,
    Sent,
    Failed(String),
}

/// Result of one cycle for one target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetOutcome {
    pub monitor_key: String,
    pub decision: Decision,
    pub notify: NotifyOutcome,
    pub history_written: bool,
}

/// Totals for a whole run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub checked: usize,
    pub online: usize,
    pub offline: usize,
    pub notified: usize,
    pub notify_failures: usize,
    pub suppressed: usize,
    pub history_errors: usize,
}

impl RunSummary {
    pub fn record(&mut self, outcome: &TargetOutcome) {
        self.checked += 1;
        match outcome.decision.new_status {
            HealthStatus::Online => self.online += 1,
            HealthStatus::Offline => self.offline += 1,
            HealthStatus::Unknown => {}
        }
        match outcome.notify {
            NotifyOutcome::Sent => self.notified += 1,
            NotifyOutcome::Failed(_) => self.notify_failures += 1,
            NotifyOutcome::NotAttempted => {}
        }
        if outcome.decision.reason == DecisionReason::Debounced {
            self.suppressed += 1;
        }
        if !outcome.history_written {
            self.history_errors += 1;
        }
    }
}

/// Drives probe, decision, notification and persistence for all targets
#[derive(Debug)]
pub struct Runner {
    targets: Vec<MonitorTarget>,
    probe: Arc<dyn Probe>,
    notifier: Arc<dyn Notifier>,
    store: HistoryStore,
    clock: Arc<dyn Clock>,
    concurrency: usize,
}

impl Runner {
    pub fn new(
        targets: Vec<MonitorTarget>,
        probe: Arc<dyn Probe>,
        notifier: Arc<dyn Notifier>,
        store: HistoryStore,
    ) -> Self {
        Self {
            targets,
            probe,
            notifier,
            store,
            clock: Arc::new(SystemClock),
            concurrency: 1,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Number of targets checked at once. Values below 1 mean sequential.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn targets(&self) -> &[MonitorTarget] {
        &self.targets
    }

    /// Check every target once. A failing target never stops the others.
    pub async fn run_once(&self) -> RunSummary {
        let mut summary = RunSummary::default();

        if self.concurrency <= 1 {
            for target in &self.targets {
                let outcome = check_target(
                    target,
                    self.probe.as_ref(),
                    self.notifier.as_ref(),
                    &self.store,
                    self.clock.as_ref(),
                )
                .await;
                summary.record(&outcome);
            }
            return summary;
        }

        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();
        for target in self.targets.iter().cloned() {
            let permits = Arc::clone(&permits);
            let probe = Arc::clone(&self.probe);
            let notifier = Arc::clone(&self.notifier);
            let store = self.store.clone();
            let clock = Arc::clone(&self.clock);

            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                check_target(
                    &target,
                    probe.as_ref(),
                    notifier.as_ref(),
                    &store,
                    clock.as_ref(),
                )
                .await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => summary.record(&outcome),
                Err(e) => tracing::error!("Target check task failed: {}", e),
            }
        }
        summary
    }

    /// Repeat [`run_once`](Self::run_once) every `interval` until cancelled
    pub async fn watch(&self, interval: Duration, cancel: CancellationToken) -> RunSummary {
        loop {
            let summary = self.run_once().await;
            log_summary(&summary);

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = cancel.cancelled() => {
                    tracing::debug!("Watch loop cancelled");
                    return summary;
                }
            }
        }
    }
}

/// Log the totals of a run
pub fn log_summary(summary: &RunSummary) {
    tracing::info!(
        "Check completed: {} checked, {} online, {} offline, {} alerts sent, {} alert failures, {} suppressed",
        summary.checked,
        summary.online,
        summary.offline,
        summary.notified,
        summary.notify_failures,
        summary.suppressed
    );
    if summary.history_errors > 0 {
        tracing::warn!("{} history writes failed", summary.history_errors);
    }
}

/// Run one full cycle for one target
pub async fn check_target(
    target: &MonitorTarget,
    probe: &dyn Probe,
    notifier: &dyn Notifier,
    store: &HistoryStore,
    clock: &dyn Clock,
) -> TargetOutcome {
    tracing::debug!("Checking '{}' ({})", target.name, target.url);
    let result = probe.probe(target).await;
    let now = clock.now();

    let history = match store.read(&target.monitor_key, now.date_naive()) {
        Ok(history) => history,
        Err(e) => {
            tracing::warn!(
                "Reading history for '{}' failed, assuming unknown: {}",
                target.monitor_key,
                e
            );
            HistoryRecord::default()
        }
    };

    let decision = decide(target, &result, &history, now);
    match decision.new_status {
        HealthStatus::Offline => tracing::warn!(
            "'{}' is offline ({}): {}",
            target.name,
            decision.reason,
            result.failure_detail()
        ),
        _ => tracing::info!(
            "'{}' is online (HTTP {}, {:.2}s, {})",
            target.name,
            result.http_status.unwrap_or_default(),
            result.latency.as_secs_f64(),
            decision.reason
        ),
    }

    let notify = if decision.should_notify {
        let notification = Notification::for_decision(target, &result, &decision, now);
        match notifier
            .notify(&target.webhook_endpoint, &notification)
            .await
        {
            Ok(()) => {
                tracing::info!("Alert for '{}' sent ({})", target.name, decision.reason);
                NotifyOutcome::Sent
            }
            Err(e) => {
                tracing::warn!(
                    "Alert via '{}' for '{}' failed: {}",
                    notifier.type_name(),
                    target.name,
                    e
                );
                NotifyOutcome::Failed(e.to_string())
            }
        }
    } else {
        NotifyOutcome::NotAttempted
    };

    let mut entries = vec![LogEntry::observation(target, &result, &decision, now)];
    match &notify {
        NotifyOutcome::Sent => entries.push(LogEntry::notification(decision.reason, None, now)),
        NotifyOutcome::Failed(error) => {
            entries.push(LogEntry::notification(
                decision.reason,
                Some(error.as_str()),
                now,
            ))
        }
        NotifyOutcome::NotAttempted if decision.reason == DecisionReason::Debounced => {
            tracing::info!("Alert for '{}' suppressed by debounce window", target.name);
            entries.push(LogEntry::suppressed(history.last_notification_at, now))
        }
        NotifyOutcome::NotAttempted => {}
    }

    let mut history_written = true;
    for entry in &entries {
        if let Err(e) = store.append(&target.monitor_key, entry) {
            tracing::warn!(
                "Writing history for '{}' failed: {}",
                target.monitor_key,
                e
            );
            history_written = false;
        }
    }

    TargetOutcome {
        monitor_key: target.monitor_key.clone(),
        decision,
        notify,
        history_written,
    }
}
