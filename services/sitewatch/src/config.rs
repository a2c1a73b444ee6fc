//! Configuration types for the sitewatch service
//!
//! Targets come from either a JSON file or a dotenv file using numbered
//! `MONITOR_<n>_*` groups.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::history::DEFAULT_SCAN_LINES;
use crate::io::HttpSettings;
use crate::monitor::MonitorTarget;

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "config.json";
/// Fallback when the JSON config does not exist
pub const DEFAULT_ENV_FILE: &str = ".env";

const MONITOR_KEY_PATTERN: &str = r"^[A-Za-z0-9][A-Za-z0-9._-]*$";
const MONITOR_GROUP_PATTERN: &str = r"^MONITOR_(\d+)_NAME$";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub targets: Vec<MonitorTarget>,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_scan_lines")]
    pub history_scan_lines: usize,
    #[serde(default)]
    pub probe: ProbeSettings,
    #[serde(default)]
    pub notify: NotifySettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            log_dir: default_log_dir(),
            concurrency: default_concurrency(),
            history_scan_lines: default_scan_lines(),
            probe: ProbeSettings::default(),
            notify: NotifySettings::default(),
        }
    }
}

/// Settings for the availability probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeSettings {
    #[serde(default = "default_probe_timeout", with = "humantime_serde")]
    pub timeout: Duration,
    #[serde(default = "default_connect_timeout", with = "humantime_serde")]
    pub connect_timeout: Duration,
    #[serde(default = "default_probe_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub accept_invalid_certs: bool,
    #[serde(default = "default_success_status_codes")]
    pub success_status_codes: Vec<u16>,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            timeout: default_probe_timeout(),
            connect_timeout: default_connect_timeout(),
            user_agent: default_probe_user_agent(),
            accept_invalid_certs: false,
            success_status_codes: default_success_status_codes(),
        }
    }
}

impl ProbeSettings {
    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            timeout: self.timeout,
            connect_timeout: Some(self.connect_timeout),
            user_agent: self.user_agent.clone(),
            accept_invalid_certs: self.accept_invalid_certs,
        }
    }
}

/// Settings for the webhook notifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifySettings {
    #[serde(default = "default_notify_timeout", with = "humantime_serde")]
    pub timeout: Duration,
    #[serde(default = "default_notify_user_agent")]
    pub user_agent: String,
}

impl Default for NotifySettings {
    fn default() -> Self {
        Self {
            timeout: default_notify_timeout(),
            user_agent: default_notify_user_agent(),
        }
    }
}

impl NotifySettings {
    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            timeout: self.timeout,
            connect_timeout: None,
            user_agent: self.user_agent.clone(),
            accept_invalid_certs: false,
        }
    }
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_concurrency() -> usize {
    1
}

fn default_scan_lines() -> usize {
    DEFAULT_SCAN_LINES
}

fn default_probe_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_probe_user_agent() -> String {
    "SiteMonitor/1.0".to_string()
}

fn default_success_status_codes() -> Vec<u16> {
    vec![200, 204, 301, 302]
}

fn default_notify_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_notify_user_agent() -> String {
    "ServiceMonitor/1.0".to_string()
}

impl Config {
    /// Check the invariants the runner relies on
    pub fn validate(&self) -> crate::Result<()> {
        if self.targets.is_empty() {
            return Err(crate::SitewatchError::Config(
                "No monitors configured".to_string(),
            ));
        }
        if self.concurrency == 0 {
            return Err(crate::SitewatchError::Config(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.history_scan_lines == 0 {
            return Err(crate::SitewatchError::Config(
                "history_scan_lines must be at least 1".to_string(),
            ));
        }

        let key_pattern = Regex::new(MONITOR_KEY_PATTERN)
            .map_err(|e| crate::SitewatchError::Config(format!("Invalid key pattern: {}", e)))?;
        let mut seen = HashSet::new();
        for target in &self.targets {
            if target.url.trim().is_empty() || target.webhook_endpoint.trim().is_empty() {
                return Err(crate::SitewatchError::Config(format!(
                    "Monitor '{}' needs both a url and a webhook endpoint",
                    target.name
                )));
            }
            if !key_pattern.is_match(&target.monitor_key) {
                return Err(crate::SitewatchError::Config(format!(
                    "Monitor key '{}' is not filesystem-safe",
                    target.monitor_key
                )));
            }
            if !seen.insert(target.monitor_key.as_str()) {
                return Err(crate::SitewatchError::Config(format!(
                    "Duplicate monitor key '{}'",
                    target.monitor_key
                )));
            }
        }
        Ok(())
    }
}

/// Config path used when none is given on the command line
///
/// Prefers `config.json` and falls back to `.env` when only that exists.
pub fn default_config_path(dir: &Path) -> PathBuf {
    let json = dir.join(DEFAULT_CONFIG_FILE);
    let env = dir.join(DEFAULT_ENV_FILE);
    if !json.exists() && env.exists() {
        env
    } else {
        json
    }
}

fn is_env_file(path: &Path) -> bool {
    path.file_name().and_then(|n| n.to_str()) == Some(DEFAULT_ENV_FILE)
        || path.extension().and_then(|e| e.to_str()) == Some("env")
}

/// Load configuration from a JSON or dotenv file, chosen by file name
pub fn load_config(path: &Path) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::SitewatchError::Config(format!("Failed to read config file {:?}: {}", path, e))
    })?;

    if is_env_file(path) {
        tracing::debug!("Parsing {:?} as dotenv", path);
        config_from_env(&parse_env(&content))
    } else {
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }
}

/// Parse `KEY=VALUE` lines, skipping comments and trimming quotes
pub fn parse_env(content: &str) -> BTreeMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| {
            let value = value
                .trim()
                .trim_matches(|c: char| c == '"' || c == '\'')
                .to_string();
            (key.trim().to_string(), value)
        })
        .collect()
}

/// Build a config from `MONITOR_<n>_{NAME,URL,WEBHOOK,KEY}` groups
///
/// Groups are read in ascending `n` for every index that appears in a
/// `MONITOR_<n>_NAME` key. Incomplete groups are skipped.
pub fn config_from_env(env: &BTreeMap<String, String>) -> crate::Result<Config> {
    let group = Regex::new(MONITOR_GROUP_PATTERN)
        .map_err(|e| crate::SitewatchError::Config(format!("Invalid group pattern: {}", e)))?;

    let indices: BTreeSet<u64> = env
        .keys()
        .filter_map(|key| group.captures(key))
        .filter_map(|caps| caps[1].parse::<u64>().ok())
        .collect();

    let mut config = Config::default();
    for i in indices {
        let field = |suffix: &str| env.get(&format!("MONITOR_{}_{}", i, suffix)).cloned();
        match (field("NAME"), field("URL"), field("WEBHOOK"), field("KEY")) {
            (Some(name), Some(url), Some(webhook_endpoint), Some(monitor_key)) => {
                config.targets.push(MonitorTarget {
                    name,
                    url,
                    webhook_endpoint,
                    monitor_key,
                });
            }
            _ => tracing::warn!("Skipping MONITOR_{}: incomplete configuration", i),
        }
    }

    if let Some(log_dir) = env.get("LOG_DIR") {
        config.log_dir = PathBuf::from(log_dir);
    }
    if let Some(concurrency) = env.get("CONCURRENCY") {
        config.concurrency = concurrency.parse().map_err(|_| {
            crate::SitewatchError::Config(format!("Invalid CONCURRENCY '{}'", concurrency))
        })?;
    }
    if let Some(lines) = env.get("HISTORY_SCAN_LINES") {
        config.history_scan_lines = lines.parse().map_err(|_| {
            crate::SitewatchError::Config(format!("Invalid HISTORY_SCAN_LINES '{}'", lines))
        })?;
    }

    Ok(config)
}
