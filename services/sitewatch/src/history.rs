//! Append-only history log per monitored target
//!
//! Every target owns a directory under the log root holding one file per UTC
//! day (`<log_dir>/<monitor_key>/YYYY-MM-DD.log`). Lines look like
//!
//! ```text
//! [2026-03-14T12:00:00Z] ALERT API | URL: https://api.example.com | HTTP: - | ... | Status: offline | Error: timed out
//! [2026-03-14T12:00:00Z] WEBHOOK Sent alert (first_failure)
//! [2026-03-14T12:10:00Z] SKIP Skipping notification - last alert at 2026-03-14T12:00:00Z, 10.0 minutes ago
//! ```
//!
//! The current [`HistoryRecord`] is never stored separately. It is rebuilt
//! from the most recent lines, across day boundaries, by [`parse_history`].

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

use crate::engine::{Decision, DecisionReason};
use crate::monitor::{HealthStatus, MonitorTarget, ProbeResult};

/// Number of trailing lines scanned when rebuilding a record
pub const DEFAULT_SCAN_LINES: usize = 20;

const LEGACY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const STATUS_TOKEN: &str = "Status: ";
const LAST_ALERT_TOKEN: &str = "last alert at ";

/// Last known state of one target, as far as the engine is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HistoryRecord {
    pub last_status: HealthStatus,
    pub last_notification_at: Option<DateTime<Utc>>,
}

/// Kind of a history line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Successful probe
    Ok,
    /// Failed probe
    Alert,
    /// Notification marker: an alert was attempted
    Webhook,
    /// An alert was suppressed by the debounce window. Carries the time of
    /// the alert that opened the window, never a new one.
    Skip,
}

impl LogLevel {
    fn from_token(token: &str) -> Option<Self> {
        let token = token.trim_start_matches('[').trim_end_matches(']');
        match token {
            "OK" => Some(LogLevel::Ok),
            "ALERT" => Some(LogLevel::Alert),
            "WEBHOOK" => Some(LogLevel::Webhook),
            "SKIP" => Some(LogLevel::Skip),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Ok => write!(f, "OK"),
            LogLevel::Alert => write!(f, "ALERT"),
            LogLevel::Webhook => write!(f, "WEBHOOK"),
            LogLevel::Skip => write!(f, "SKIP"),
        }
    }
}

/// One line of the history log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

impl LogEntry {
    /// The per-cycle observation line for a probed target
    pub fn observation(
        target: &MonitorTarget,
        probe: &ProbeResult,
        decision: &Decision,
        at: DateTime<Utc>,
    ) -> Self {
        let http = probe
            .http_status
            .map(|code| code.to_string())
            .unwrap_or_else(|| "-".to_string());
        let size = probe
            .response_size
            .map(|size| size.to_string())
            .unwrap_or_else(|| "-".to_string());

        let mut message = format!(
            "{} | URL: {} | HTTP: {} | Time: {:.2}s | Size: {} bytes | Method: GET | Reason: {} | {}{}",
            target.name,
            target.url,
            http,
            probe.latency.as_secs_f64(),
            size,
            decision.reason,
            STATUS_TOKEN,
            decision.new_status
        );
        if decision.new_status == HealthStatus::Offline {
            message.push_str(" | ");
            message.push_str(&probe.failure_detail());
        }

        let level = if decision.new_status == HealthStatus::Online {
            LogLevel::Ok
        } else {
            LogLevel::Alert
        };

        Self {
            timestamp: at,
            level,
            message,
        }
    }

    /// The notification marker, written whenever an alert was attempted
    pub fn notification(reason: DecisionReason, error: Option<&str>, at: DateTime<Utc>) -> Self {
        let kind = if reason == DecisionReason::Recovery {
            "recovery alert"
        } else {
            "alert"
        };
        let message = match error {
            None => format!("Sent {} ({})", kind, reason),
            Some(error) => format!("Error sending {} ({}): {}", kind, reason, error),
        };

        Self {
            timestamp: at,
            level: LogLevel::Webhook,
            message,
        }
    }

    /// Record of an alert held back by the debounce window
    ///
    /// The time of the alert that opened the window is repeated so it stays
    /// recoverable after the `WEBHOOK` line has scrolled out of the scan.
    pub fn suppressed(last_notification_at: Option<DateTime<Utc>>, at: DateTime<Utc>) -> Self {
        let message = match last_notification_at {
            Some(notified_at) => {
                let minutes = at.signed_duration_since(notified_at).num_seconds() as f64 / 60.0;
                format!(
                    "Skipping notification - {}{}, {:.1} minutes ago",
                    LAST_ALERT_TOKEN,
                    notified_at.to_rfc3339_opts(SecondsFormat::Secs, true),
                    minutes
                )
            }
            None => "Skipping notification".to_string(),
        };

        Self {
            timestamp: at,
            level: LogLevel::Skip,
            message,
        }
    }

    /// Render as a single log line without the trailing newline
    pub fn to_line(&self) -> String {
        format!(
            "[{}] {} {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.level,
            self.message
        )
    }
}

/// The fields recovered from one log line
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedLine {
    pub timestamp: Option<DateTime<Utc>>,
    pub level: Option<LogLevel>,
    pub status: Option<HealthStatus>,
    /// Time of the last alert this line vouches for
    pub notified_at: Option<DateTime<Utc>>,
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, LEGACY_TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Extract timestamp, level, status and alert time from a log line
///
/// Returns `None` for lines that do not start with a bracketed prefix.
pub fn parse_line(line: &str) -> Option<ParsedLine> {
    let line = line.trim();
    let rest = line.strip_prefix('[')?;
    let close = rest.find(']')?;
    let timestamp = parse_timestamp(&rest[..close]);
    let body = rest[close + 1..].trim_start();

    let level = body.split_whitespace().next().and_then(LogLevel::from_token);

    let status = body
        .find(STATUS_TOKEN)
        .map(|idx| &body[idx + STATUS_TOKEN.len()..])
        .and_then(|tail| {
            let word: String = tail
                .chars()
                .take_while(|c| c.is_ascii_alphabetic())
                .collect();
            word.parse::<HealthStatus>().ok()
        })
        .filter(|status| *status != HealthStatus::Unknown)
        .or(match level {
            Some(LogLevel::Ok) => Some(HealthStatus::Online),
            Some(LogLevel::Alert) => Some(HealthStatus::Offline),
            _ => None,
        });

    let notified_at = match level {
        Some(LogLevel::Webhook) => timestamp,
        Some(LogLevel::Skip) => body.find(LAST_ALERT_TOKEN).and_then(|idx| {
            let tail = &body[idx + LAST_ALERT_TOKEN.len()..];
            let raw = tail.split([',', ' ']).next().unwrap_or_default();
            parse_timestamp(raw)
        }),
        _ => None,
    };

    Some(ParsedLine {
        timestamp,
        level,
        status,
        notified_at,
    })
}

/// Rebuild a record from the last `scan_lines` lines, oldest first
pub fn parse_history<S: AsRef<str>>(lines: &[S], scan_lines: usize) -> HistoryRecord {
    let start = lines.len().saturating_sub(scan_lines);
    let mut record = HistoryRecord::default();

    for line in lines[start..].iter().rev() {
        let Some(parsed) = parse_line(line.as_ref()) else {
            continue;
        };

        if record.last_status == HealthStatus::Unknown {
            if let Some(status) = parsed.status {
                record.last_status = status;
            }
        }
        if record.last_notification_at.is_none() {
            record.last_notification_at = parsed.notified_at;
        }

        if record.last_status != HealthStatus::Unknown && record.last_notification_at.is_some() {
            break;
        }
    }

    record
}

/// File-backed history, partitioned by monitor key and day
#[derive(Debug, Clone)]
pub struct HistoryStore {
    root: PathBuf,
    scan_lines: usize,
}

impl HistoryStore {
    pub fn new(root: impl Into<PathBuf>, scan_lines: usize) -> Self {
        Self {
            root: root.into(),
            scan_lines,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding all partitions of one target
    pub fn partition_dir(&self, monitor_key: &str) -> PathBuf {
        self.root.join(monitor_key)
    }

    /// File holding one day of one target's history
    pub fn partition_path(&self, monitor_key: &str, date: NaiveDate) -> PathBuf {
        self.partition_dir(monitor_key)
            .join(format!("{}.log", date.format("%Y-%m-%d")))
    }

    /// Rebuild the current record for `monitor_key`
    ///
    /// The last `scan_lines` lines are taken across partitions, starting with
    /// `today` and walking back through earlier days, so a day change does not
    /// hide the previous alert. Partitions dated after `today` are ignored.
    pub fn read(&self, monitor_key: &str, today: NaiveDate) -> crate::Result<HistoryRecord> {
        let mut recent: Vec<String> = Vec::new();
        for path in partitions_newest_first(&self.partition_dir(monitor_key), today)? {
            let needed = self.scan_lines.saturating_sub(recent.len());
            if needed == 0 {
                break;
            }

            let content = fs::read_to_string(&path).map_err(|e| {
                crate::SitewatchError::History(format!("Failed to read {:?}: {}", path, e))
            })?;
            let lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).collect();
            let start = lines.len().saturating_sub(needed);
            tracing::trace!("Taking {} lines from {:?}", lines.len() - start, path);

            let mut older: Vec<String> = lines[start..].iter().map(|l| l.to_string()).collect();
            older.append(&mut recent);
            recent = older;
        }

        let record = parse_history(&recent, self.scan_lines);
        tracing::debug!(
            "History for '{}': status={}, last_notification={:?}",
            monitor_key,
            record.last_status,
            record.last_notification_at
        );
        Ok(record)
    }

    /// Append one entry to the partition of the entry's UTC day
    ///
    /// The file is exclusively locked for the duration of the write and the
    /// line goes out in a single call, so concurrent writers never interleave.
    pub fn append(&self, monitor_key: &str, entry: &LogEntry) -> crate::Result<()> {
        let dir = self.partition_dir(monitor_key);
        fs::create_dir_all(&dir)?;

        let path = self.partition_path(monitor_key, entry.timestamp.date_naive());
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        file.lock()?;

        let mut line = entry.to_line();
        line.push('\n');
        let written = file.write_all(line.as_bytes());
        let unlocked = file.unlock();
        written?;
        unlocked?;

        tracing::trace!("Appended to {:?}: {}", path, line.trim_end());
        Ok(())
    }
}

/// Partition files dated `today` or earlier, newest day first
fn partitions_newest_first(dir: &Path, today: NaiveDate) -> crate::Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut dated = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("log") {
            continue;
        }
        let date = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(|stem| NaiveDate::parse_from_str(stem, "%Y-%m-%d").ok());
        match date {
            Some(date) if date <= today => dated.push((date, path)),
            Some(_) => tracing::debug!("Ignoring future partition {:?}", path),
            None => tracing::debug!("Ignoring unrecognized file {:?}", path),
        }
    }

    dated.sort_by(|a, b| b.0.cmp(&a.0));
    Ok(dated.into_iter().map(|(_, path)| path).collect())
}
