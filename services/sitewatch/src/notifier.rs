//! Notifier trait and alert content

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::engine::{Decision, DecisionReason};
use crate::monitor::{HealthStatus, MonitorTarget, ProbeResult};

/// Whether an alert reports an outage or a recovery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Down,
    Up,
}

impl Severity {
    /// Embed color: red for down, green for up
    pub fn color(self) -> u32 {
        match self {
            Severity::Down => 0xFF0000,
            Severity::Up => 0x00FF00,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Severity::Down => "🚨 Service Offline",
            Severity::Up => "✅ Service Online",
        }
    }
}

/// A notification to be sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub target_name: String,
    pub detail: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    /// Build the alert for a decision that asked for one
    pub fn for_decision(
        target: &MonitorTarget,
        probe: &ProbeResult,
        decision: &Decision,
        at: DateTime<Utc>,
    ) -> Self {
        let (severity, detail) = if decision.new_status == HealthStatus::Online {
            let http = probe
                .http_status
                .map(|code| format!(" HTTP {}", code))
                .unwrap_or_default();
            (
                Severity::Up,
                format!("Service {} is back online.{}", target.name, http),
            )
        } else {
            let mut detail = format!(
                "Service {} is offline. {}",
                target.name,
                probe.failure_detail()
            );
            if decision.reason == DecisionReason::RepeatFailure {
                detail.push_str(" (still down)");
            }
            (Severity::Down, detail)
        };

        Self {
            title: severity.title().to_string(),
            target_name: target.name.clone(),
            detail,
            severity,
            timestamp: at,
        }
    }

    /// Description line combining the target name and the detail
    pub fn description(&self) -> String {
        format!("**{}** - {}", self.target_name, self.detail)
    }
}

/// Trait for sending notifications
#[async_trait]
pub trait Notifier: Send + Sync + std::fmt::Debug {
    /// Get the notifier type name (e.g. "webhook")
    fn type_name(&self) -> &str;

    /// Send a notification to `endpoint`. `Ok` means the endpoint accepted it.
    async fn notify(&self, endpoint: &str, notification: &Notification) -> crate::Result<()>;
}
