//! BDD test world for sitewatch

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cucumber::World;

use sitewatch::engine::Decision;
use sitewatch::history::HistoryRecord;
use sitewatch::io::{HttpClient, HttpResponse};
use sitewatch::monitor::{MonitorTarget, Probe, ProbeResult};
use sitewatch::notifier::{Notification, Notifier};
use sitewatch::runner::{Clock, RunSummary};
use sitewatch::SitewatchError;

pub fn test_target(key: &str) -> MonitorTarget {
    MonitorTarget {
        name: key.to_uppercase(),
        url: format!("https://{}.example.com/health", key),
        webhook_endpoint: format!("https://hooks.example.com/{}", key),
        monitor_key: key.to_string(),
    }
}

/// Clock pinned to a single instant
#[derive(Debug)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Probe whose answer per URL is set by the scenario
#[derive(Debug, Default)]
pub struct SwitchProbe {
    down: Mutex<HashSet<String>>,
}

impl SwitchProbe {
    pub fn set_down(&self, url: &str, down: bool) {
        let mut set = self.down.lock().unwrap();
        if down {
            set.insert(url.to_string());
        } else {
            set.remove(url);
        }
    }
}

#[async_trait]
impl Probe for SwitchProbe {
    async fn probe(&self, target: &MonitorTarget) -> ProbeResult {
        if self.down.lock().unwrap().contains(&target.url) {
            ProbeResult::failed("connection refused", Duration::from_millis(1))
        } else {
            ProbeResult::responded(true, 200, Duration::from_millis(15), 128)
        }
    }
}

/// Notifier that records alerts and can be told to reject them
#[derive(Debug, Default)]
pub struct CountingNotifier {
    pub reject: AtomicBool,
    pub sent: Mutex<Vec<Notification>>,
}

impl CountingNotifier {
    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for CountingNotifier {
    fn type_name(&self) -> &str {
        "counting"
    }

    async fn notify(&self, _endpoint: &str, notification: &Notification) -> sitewatch::Result<()> {
        self.sent.lock().unwrap().push(notification.clone());
        if self.reject.load(Ordering::SeqCst) {
            Err(SitewatchError::Notifier("rejected by test".to_string()))
        } else {
            Ok(())
        }
    }
}

/// HTTP client standing in for a webhook endpoint
#[derive(Debug, Default)]
pub struct FakeWebhookClient {
    /// `None` simulates a network failure
    pub status: Option<u16>,
    pub posted: Mutex<Vec<serde_json::Value>>,
}

#[async_trait]
impl HttpClient for FakeWebhookClient {
    async fn get(&self, url: &str) -> sitewatch::Result<HttpResponse> {
        Err(SitewatchError::Http(format!("GET {} not expected", url)))
    }

    async fn post_json(&self, _url: &str, body: &serde_json::Value) -> sitewatch::Result<HttpResponse> {
        self.posted.lock().unwrap().push(body.clone());
        match self.status {
            Some(status) => Ok(HttpResponse {
                status,
                body: String::new(),
                size: 0,
            }),
            None => Err(SitewatchError::Http("connection refused".to_string())),
        }
    }
}

#[derive(Debug, Default, World)]
pub struct SitewatchWorld {
    // Decision testing
    pub history: HistoryRecord,
    pub probe_result: Option<ProbeResult>,
    pub decision: Option<Decision>,

    // History testing
    pub log_dir: Option<tempfile::TempDir>,
    pub read_record: Option<HistoryRecord>,

    // Runner testing
    pub targets: Vec<MonitorTarget>,
    pub probe: Arc<SwitchProbe>,
    pub notifier: Arc<CountingNotifier>,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_summary: Option<RunSummary>,

    // Notification testing
    pub webhook_client: Option<Arc<FakeWebhookClient>>,
    pub notify_result: Option<sitewatch::Result<()>>,
}

impl SitewatchWorld {
    /// Log root for the scenario, created on first use
    pub fn log_root(&mut self) -> &Path {
        self.log_dir
            .get_or_insert_with(|| tempfile::tempdir().expect("create temp dir"))
            .path()
    }
}
