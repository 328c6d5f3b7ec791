// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for the transport layer.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use serde_json::json;
use yare::parameterized;

use obx_core::event::{EventRecord, EventStatus};
use obx_core::protocol::BatchEnvelope;

use super::test_helpers::MockTransport;
use super::transport::{HttpTransport, Transport, TransportError};

#[parameterized(
    connectivity = { TransportError::Connectivity("refused".into()), true },
    timeout = { TransportError::Timeout, true },
    rejected = { TransportError::Rejected("400".into()), false },
)]
fn connectivity_classification(err: TransportError, trips_breaker: bool) {
    assert_eq!(err.is_connectivity(), trips_breaker);
}

#[test]
fn http_transport_builds_with_timeout() {
    let transport = HttpTransport::new(
        "https://collector.example.edu/v1/events".into(),
        "test-key".into(),
        Duration::from_secs(5),
    );
    assert!(transport.is_ok());
}

fn make_envelope(batch_id: &str, ids: &[i64]) -> BatchEnvelope {
    let records: Vec<EventRecord> = ids
        .iter()
        .map(|id| EventRecord {
            id: *id,
            owner_id: "system".into(),
            kind: "app_launch".into(),
            payload: json!({"id": id}),
            created_at_ms: *id,
            status: EventStatus::Pending,
            retry_count: 0,
        })
        .collect();
    BatchEnvelope::new(batch_id.into(), &records)
}

#[tokio::test]
async fn mock_defaults_to_success_and_echoes_batch_id() {
    let transport = MockTransport::new();

    let ack = transport.send(&make_envelope("b-1", &[1, 2])).await.unwrap();
    assert_eq!(ack.batch_id, "b-1");
    assert_eq!(transport.sent_ids(), vec![vec![1, 2]]);
}

#[tokio::test]
async fn mock_pops_scripted_outcomes_in_order() {
    let transport = MockTransport::new();
    transport.fail_next(TransportError::Timeout);
    transport.push_outcome(Ok(()));

    let err = transport.send(&make_envelope("b-1", &[1])).await.unwrap_err();
    assert!(matches!(err, TransportError::Timeout));

    transport.send(&make_envelope("b-2", &[2])).await.unwrap();

    // Script exhausted: back to default success
    transport.send(&make_envelope("b-3", &[3])).await.unwrap();
    assert_eq!(transport.send_count(), 3);
}

#[tokio::test]
async fn mock_clones_share_observed_state() {
    let transport = MockTransport::new();
    let observer = transport.clone();

    transport.send(&make_envelope("b-1", &[7])).await.unwrap();

    assert_eq!(observer.send_count(), 1);
    assert_eq!(observer.sent_ids(), vec![vec![7]]);
}
