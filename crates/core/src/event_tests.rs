// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use serde_json::json;
use yare::parameterized;

#[parameterized(
    pending = { EventStatus::Pending, "pending" },
    synced = { EventStatus::Synced, "synced" },
    failed = { EventStatus::Failed, "failed" },
)]
fn status_round_trips_through_str(status: EventStatus, s: &str) {
    assert_eq!(status.as_str(), s);
    assert_eq!(s.parse::<EventStatus>().unwrap(), status);
    assert_eq!(status.to_string(), s);
}

#[test]
fn status_rejects_unknown() {
    let err = "in_flight".parse::<EventStatus>().unwrap_err();
    assert!(matches!(err, Error::InvalidStatus(_)));
}

#[test]
fn status_serde_uses_snake_case() {
    let json = serde_json::to_string(&EventStatus::Pending).unwrap();
    assert_eq!(json, "\"pending\"");
}

fn make_record(status: EventStatus, retry_count: i64) -> EventRecord {
    EventRecord {
        id: 1,
        owner_id: "system".into(),
        kind: "app_launch".into(),
        payload: json!({"app": "calculator"}),
        created_at_ms: 1_700_000_000_000,
        status,
        retry_count,
    }
}

#[parameterized(
    pending = { EventStatus::Pending, 0, true },
    pending_with_retries = { EventStatus::Pending, 99, true },
    synced = { EventStatus::Synced, 0, false },
    failed_below_ceiling = { EventStatus::Failed, 4, true },
    failed_at_ceiling = { EventStatus::Failed, 5, false },
    failed_above_ceiling = { EventStatus::Failed, 7, false },
)]
fn eligibility_honors_status_and_retry_ceiling(
    status: EventStatus,
    retry_count: i64,
    eligible: bool,
) {
    let record = make_record(status, retry_count);
    assert_eq!(record.is_eligible(5), eligible);
}

#[test]
fn record_serde_round_trip_preserves_payload_verbatim() {
    let record = make_record(EventStatus::Pending, 0);
    let json = serde_json::to_string(&record).unwrap();
    let back: EventRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(back, record);
    assert_eq!(back.payload["app"], "calculator");
}
