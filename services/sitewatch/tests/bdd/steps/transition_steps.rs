//! Step definitions for alert decisions

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use cucumber::{given, then, when};

use sitewatch::engine::decide;
use sitewatch::history::HistoryRecord;
use sitewatch::monitor::{HealthStatus, ProbeResult};

use crate::world::{test_target, SitewatchWorld};

fn decision_time() -> DateTime<Utc> {
    "2026-03-14T12:00:00Z".parse().unwrap()
}

fn status(name: &str) -> HealthStatus {
    name.parse().unwrap()
}

fn decide_now(world: &mut SitewatchWorld) {
    let probe = world.probe_result.as_ref().expect("no probe result");
    world.decision = Some(decide(
        &test_target("api"),
        probe,
        &world.history,
        decision_time(),
    ));
}

// --- Given steps ---

#[given(expr = "the target was last seen {string} and notified {int} minutes ago")]
fn seen_and_notified(world: &mut SitewatchWorld, last: String, minutes: i64) {
    world.history = HistoryRecord {
        last_status: status(&last),
        last_notification_at: Some(decision_time() - TimeDelta::minutes(minutes)),
    };
}

#[given(expr = "the target was last seen {string} with no alert on record")]
fn seen_without_alert(world: &mut SitewatchWorld, last: String) {
    world.history = HistoryRecord {
        last_status: status(&last),
        last_notification_at: None,
    };
}

#[given("the target has no history")]
fn no_history(world: &mut SitewatchWorld) {
    world.history = HistoryRecord::default();
}

// --- When steps ---

#[when("a probe succeeds")]
fn probe_succeeds(world: &mut SitewatchWorld) {
    world.probe_result = Some(ProbeResult::responded(
        true,
        200,
        Duration::from_millis(40),
        512,
    ));
    decide_now(world);
}

#[when(expr = "a probe fails with error {string}")]
fn probe_fails_with_error(world: &mut SitewatchWorld, error: String) {
    world.probe_result = Some(ProbeResult::failed(error, Duration::from_secs(10)));
    decide_now(world);
}

#[when(expr = "a probe fails with HTTP status {int}")]
fn probe_fails_with_status(world: &mut SitewatchWorld, code: u16) {
    world.probe_result = Some(ProbeResult::responded(
        false,
        code,
        Duration::from_millis(80),
        0,
    ));
    decide_now(world);
}

// --- Then steps ---

#[then(expr = "the new status is {string}")]
fn new_status_is(world: &mut SitewatchWorld, expected: String) {
    let decision = world.decision.as_ref().expect("no decision");
    assert_eq!(decision.new_status, status(&expected));
}

#[then(expr = "an alert should be sent with reason {string}")]
fn alert_with_reason(world: &mut SitewatchWorld, reason: String) {
    let decision = world.decision.as_ref().expect("no decision");
    assert!(decision.should_notify, "expected an alert, got {:?}", decision);
    assert_eq!(decision.reason.to_string(), reason);
}

#[then("no alert should be sent")]
fn no_alert(world: &mut SitewatchWorld) {
    let decision = world.decision.as_ref().expect("no decision");
    assert!(!decision.should_notify, "unexpected alert: {:?}", decision);
}

#[then(expr = "the reason is {string}")]
fn reason_is(world: &mut SitewatchWorld, reason: String) {
    let decision = world.decision.as_ref().expect("no decision");
    assert_eq!(decision.reason.to_string(), reason);
}

#[then("the status counts as changed")]
fn status_changed(world: &mut SitewatchWorld) {
    let decision = world.decision.as_ref().expect("no decision");
    assert!(decision.changed);
}

#[then("deciding again gives the same decision")]
fn deciding_again(world: &mut SitewatchWorld) {
    let first = world.decision.clone().expect("no decision");
    decide_now(world);
    assert_eq!(world.decision.as_ref(), Some(&first));
}
