//! Discord-style webhook notifier

use std::sync::Arc;

use async_trait::async_trait;
use chrono::SecondsFormat;
use serde_json::json;

use crate::io::HttpClient;
use crate::notifier::{Notification, Notifier};

const FOOTER_TEXT: &str = "Service Monitor";

/// Posts alerts as a single embed to a webhook URL
pub struct WebhookNotifier {
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for WebhookNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookNotifier").finish()
    }
}

impl WebhookNotifier {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self { http }
    }

    /// JSON body for a notification
    pub fn payload(notification: &Notification) -> serde_json::Value {
        json!({
            "embeds": [{
                "title": notification.title,
                "description": notification.description(),
                "color": notification.severity.color(),
                "timestamp": notification
                    .timestamp
                    .to_rfc3339_opts(SecondsFormat::Secs, true),
                "footer": { "text": FOOTER_TEXT },
            }]
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn type_name(&self) -> &str {
        "webhook"
    }

    async fn notify(&self, endpoint: &str, notification: &Notification) -> crate::Result<()> {
        let payload = Self::payload(notification);

        tracing::debug!(
            "Sending webhook notification: title='{}', target='{}'",
            notification.title,
            notification.target_name
        );

        let response = self.http.post_json(endpoint, &payload).await?;

        if !(200..300).contains(&response.status) {
            return Err(crate::SitewatchError::Notifier(format!(
                "Webhook returned status {}: {}",
                response.status, response.body
            )));
        }

        tracing::debug!("Webhook notification accepted ({})", response.status);
        Ok(())
    }
}
