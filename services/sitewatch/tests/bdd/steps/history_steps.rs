//! Step definitions for history reconstruction

use std::fs::{self, OpenOptions};
use std::io::Write;

use chrono::{DateTime, NaiveDate, Utc};
use cucumber::{given, then, when};

use sitewatch::history::{HistoryStore, DEFAULT_SCAN_LINES};
use sitewatch::monitor::HealthStatus;

use crate::world::SitewatchWorld;

fn date(text: &str) -> NaiveDate {
    text.parse().unwrap()
}

#[given(expr = "the log for {string} on {string} has the line {string}")]
fn log_has_line(world: &mut SitewatchWorld, key: String, day: String, line: String) {
    let store = HistoryStore::new(world.log_root(), DEFAULT_SCAN_LINES);
    let path = store.partition_path(&key, date(&day));
    fs::create_dir_all(store.partition_dir(&key)).unwrap();
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .unwrap();
    writeln!(file, "{}", line).unwrap();
}

#[when(expr = "the history for {string} is read on {string}")]
fn read_history(world: &mut SitewatchWorld, key: String, day: String) {
    let store = HistoryStore::new(world.log_root(), DEFAULT_SCAN_LINES);
    world.read_record = Some(store.read(&key, date(&day)).unwrap());
}

#[then(expr = "the last status is {string}")]
fn last_status_is(world: &mut SitewatchWorld, expected: String) {
    let record = world.read_record.expect("history not read");
    assert_eq!(record.last_status, expected.parse::<HealthStatus>().unwrap());
}

#[then(expr = "the last alert was at {string}")]
fn last_alert_at(world: &mut SitewatchWorld, expected: String) {
    let record = world.read_record.expect("history not read");
    let expected: DateTime<Utc> = expected.parse().unwrap();
    assert_eq!(record.last_notification_at, Some(expected));
}

#[then("there is no alert on record")]
fn no_alert_on_record(world: &mut SitewatchWorld) {
    let record = world.read_record.expect("history not read");
    assert_eq!(record.last_notification_at, None);
}
