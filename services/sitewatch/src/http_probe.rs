//! HTTP GET availability probe

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use crate::config::ProbeSettings;
use crate::io::HttpClient;
use crate::monitor::{MonitorTarget, Probe, ProbeResult};

/// Probes a target with a single GET request
pub struct HttpProbe {
    success_status_codes: Vec<u16>,
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for HttpProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpProbe")
            .field("success_status_codes", &self.success_status_codes)
            .finish()
    }
}

impl HttpProbe {
    pub fn new(settings: &ProbeSettings, http: Arc<dyn HttpClient>) -> Self {
        tracing::debug!(
            "Created HttpProbe accepting status codes {:?}",
            settings.success_status_codes
        );

        Self {
            success_status_codes: settings.success_status_codes.clone(),
            http,
        }
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn probe(&self, target: &MonitorTarget) -> ProbeResult {
        tracing::debug!("Probing '{}' at {}", target.name, target.url);
        let started = Instant::now();

        match self.http.get(&target.url).await {
            Ok(response) => {
                let latency = started.elapsed();
                let success = self.success_status_codes.contains(&response.status);
                if !success {
                    tracing::debug!(
                        "Unexpected status from '{}': {}",
                        target.name,
                        response.status
                    );
                }
                ProbeResult::responded(
                    success,
                    response.status,
                    latency,
                    response.size,
                )
            }
            Err(e) => {
                tracing::debug!("Failed to probe '{}': {}", target.name, e);
                ProbeResult::failed(e.to_string(), started.elapsed())
            }
        }
    }
}
