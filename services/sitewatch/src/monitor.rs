//! Monitored targets, probe results and the probe trait

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Availability of a monitored target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    #[default]
    Unknown,
    Online,
    Offline,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Unknown => write!(f, "unknown"),
            HealthStatus::Online => write!(f, "online"),
            HealthStatus::Offline => write!(f, "offline"),
        }
    }
}

impl FromStr for HealthStatus {
    type Err = crate::SitewatchError;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "unknown" => Ok(HealthStatus::Unknown),
            "online" => Ok(HealthStatus::Online),
            "offline" => Ok(HealthStatus::Offline),
            other => Err(crate::SitewatchError::History(format!(
                "unrecognized status '{}'",
                other
            ))),
        }
    }
}

/// One monitored endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorTarget {
    pub name: String,
    pub url: String,
    pub webhook_endpoint: String,
    /// Filesystem-safe identifier, also the history partition key
    pub monitor_key: String,
}

/// Outcome of a single check of a single target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub success: bool,
    pub http_status: Option<u16>,
    pub latency: Duration,
    pub error: Option<String>,
    pub response_size: Option<u64>,
}

impl ProbeResult {
    /// A probe that got an HTTP response
    pub fn responded(success: bool, http_status: u16, latency: Duration, size: u64) -> Self {
        Self {
            success,
            http_status: Some(http_status),
            latency,
            error: None,
            response_size: Some(size),
        }
    }

    /// A probe that never got a response (connect failure, timeout, TLS)
    pub fn failed(error: impl Into<String>, latency: Duration) -> Self {
        Self {
            success: false,
            http_status: None,
            latency,
            error: Some(error.into()),
            response_size: None,
        }
    }

    /// Human-readable reason for a failed probe
    pub fn failure_detail(&self) -> String {
        match (&self.error, self.http_status) {
            (Some(error), _) => format!("Error: {}", error),
            (None, Some(code)) => format!("HTTP {}", code),
            (None, None) => "no response".to_string(),
        }
    }
}

/// Trait for checking a target's availability
#[async_trait]
pub trait Probe: Send + Sync + std::fmt::Debug {
    /// Check the target once. Transport failures are folded into the result.
    async fn probe(&self, target: &MonitorTarget) -> ProbeResult;
}
