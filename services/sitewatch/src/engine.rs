//! Transition engine: decides status changes and whether to alert
//!
//! [`decide`] is a pure function of the target, the fresh probe result, the
//! reconstructed history and the current time. The runner performs every
//! side effect the returned [`Decision`] asks for.

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::history::HistoryRecord;
use crate::monitor::{HealthStatus, MonitorTarget, ProbeResult};

/// Minimum interval between repeat alerts for a target that stays offline
pub const DEBOUNCE_WINDOW: TimeDelta = TimeDelta::minutes(30);

/// Why a decision was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    /// Offline to online
    Recovery,
    /// Offline after online or unknown
    FirstFailure,
    /// Still offline and the previous alert is outside the debounce window
    RepeatFailure,
    /// Still offline and the previous alert is inside the debounce window
    Debounced,
    /// Online after online or unknown
    SteadyState,
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionReason::Recovery => write!(f, "recovery"),
            DecisionReason::FirstFailure => write!(f, "first_failure"),
            DecisionReason::RepeatFailure => write!(f, "repeat_failure"),
            DecisionReason::Debounced => write!(f, "debounced"),
            DecisionReason::SteadyState => write!(f, "steady_state"),
        }
    }
}

/// Outcome of evaluating one probe against a target's history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub monitor_key: String,
    pub previous_status: HealthStatus,
    pub new_status: HealthStatus,
    pub changed: bool,
    pub should_notify: bool,
    pub reason: DecisionReason,
}

/// Decide the new status of `target` and whether an alert should go out now
pub fn decide(
    target: &MonitorTarget,
    probe: &ProbeResult,
    history: &HistoryRecord,
    now: DateTime<Utc>,
) -> Decision {
    let previous_status = history.last_status;
    let new_status = if probe.success {
        HealthStatus::Online
    } else {
        HealthStatus::Offline
    };

    let reason = if probe.success {
        if previous_status == HealthStatus::Offline {
            DecisionReason::Recovery
        } else {
            DecisionReason::SteadyState
        }
    } else if previous_status != HealthStatus::Offline {
        DecisionReason::FirstFailure
    } else {
        match history.last_notification_at {
            None => DecisionReason::RepeatFailure,
            // A marker from the future (clock skew) counts as inside the window.
            Some(notified_at) if now.signed_duration_since(notified_at) < DEBOUNCE_WINDOW => {
                DecisionReason::Debounced
            }
            Some(_) => DecisionReason::RepeatFailure,
        }
    };

    let should_notify = matches!(
        reason,
        DecisionReason::Recovery | DecisionReason::FirstFailure | DecisionReason::RepeatFailure
    );

    Decision {
        monitor_key: target.monitor_key.clone(),
        previous_status,
        new_status,
        changed: new_status != previous_status,
        should_notify,
        reason,
    }
}
