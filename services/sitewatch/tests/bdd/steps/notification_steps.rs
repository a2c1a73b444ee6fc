//! Step definitions for webhook delivery

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use cucumber::{given, then, when};

use sitewatch::engine::decide;
use sitewatch::history::HistoryRecord;
use sitewatch::monitor::{HealthStatus, ProbeResult};
use sitewatch::notifier::{Notification, Notifier};
use sitewatch::webhook::WebhookNotifier;

use crate::world::{test_target, FakeWebhookClient, SitewatchWorld};

async fn send(world: &mut SitewatchWorld, name: &str, probe: ProbeResult, previous: HealthStatus) {
    let client = world
        .webhook_client
        .clone()
        .expect("no webhook endpoint configured");
    let mut target = test_target("shop");
    target.name = name.to_string();

    let now: DateTime<Utc> = "2026-03-14T12:00:00Z".parse().unwrap();
    let history = HistoryRecord {
        last_status: previous,
        last_notification_at: None,
    };
    let decision = decide(&target, &probe, &history, now);
    let notification = Notification::for_decision(&target, &probe, &decision, now);

    let notifier = WebhookNotifier::new(client);
    world.notify_result = Some(
        notifier
            .notify(&target.webhook_endpoint, &notification)
            .await,
    );
}

// --- Given steps ---

#[given(expr = "a webhook endpoint answering {int}")]
fn endpoint_answering(world: &mut SitewatchWorld, status: u16) {
    world.webhook_client = Some(Arc::new(FakeWebhookClient {
        status: Some(status),
        ..Default::default()
    }));
}

#[given("an unreachable webhook endpoint")]
fn unreachable_endpoint(world: &mut SitewatchWorld) {
    world.webhook_client = Some(Arc::new(FakeWebhookClient::default()));
}

// --- When steps ---

#[when(expr = "an outage alert for {string} is sent")]
async fn outage_alert_sent(world: &mut SitewatchWorld, name: String) {
    let probe = ProbeResult::failed("connection refused", Duration::from_secs(1));
    send(world, &name, probe, HealthStatus::Online).await;
}

#[when(expr = "a recovery alert for {string} is sent")]
async fn recovery_alert_sent(world: &mut SitewatchWorld, name: String) {
    let probe = ProbeResult::responded(true, 200, Duration::from_millis(30), 64);
    send(world, &name, probe, HealthStatus::Offline).await;
}

// --- Then steps ---

#[then("the alert should be accepted")]
fn alert_accepted(world: &mut SitewatchWorld) {
    let result = world.notify_result.as_ref().expect("nothing sent");
    assert!(result.is_ok(), "alert rejected: {:?}", result);
}

#[then("the alert should be rejected")]
fn alert_rejected(world: &mut SitewatchWorld) {
    let result = world.notify_result.as_ref().expect("nothing sent");
    assert!(result.is_err());
}

#[then(expr = "the posted embed color should be {int}")]
fn embed_color(world: &mut SitewatchWorld, color: u64) {
    let client = world.webhook_client.as_ref().expect("no webhook endpoint");
    let posted = client.posted.lock().unwrap();
    let payload = posted.last().expect("nothing posted");
    assert_eq!(payload["embeds"][0]["color"].as_u64(), Some(color));
}
