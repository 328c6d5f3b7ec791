// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for the simulated transport.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use serde_json::json;

use obx_core::event::{EventRecord, EventStatus};
use obx_core::protocol::BatchEnvelope;

use super::simulated::SimulatedTransport;
use super::transport::{Transport, TransportError};

fn make_envelope() -> BatchEnvelope {
    let record = EventRecord {
        id: 1,
        owner_id: "system".into(),
        kind: "app_launch".into(),
        payload: json!({}),
        created_at_ms: 0,
        status: EventStatus::Pending,
        retry_count: 0,
    };
    BatchEnvelope::new("batch-sim".into(), &[record])
}

#[tokio::test(start_paused = true)]
async fn zero_failure_rate_always_acks() {
    let transport = SimulatedTransport::new(Duration::from_millis(50), 0.0);

    for _ in 0..20 {
        let ack = transport.send(&make_envelope()).await.unwrap();
        assert_eq!(ack.batch_id, "batch-sim");
        assert_eq!(ack.provider_batch_id.as_deref(), Some("sim-batch-sim"));
    }
}

#[tokio::test(start_paused = true)]
async fn full_failure_rate_always_fails_as_connectivity() {
    let transport = SimulatedTransport::new(Duration::from_millis(50), 1.0);

    for _ in 0..20 {
        let err = transport.send(&make_envelope()).await.unwrap_err();
        assert!(matches!(err, TransportError::Connectivity(_)));
        assert!(err.is_connectivity());
    }
}

#[test]
fn failure_rate_is_clamped() {
    // Out-of-range rates must not panic or overflow the probability roll
    let _ = SimulatedTransport::new(Duration::ZERO, 7.5);
    let _ = SimulatedTransport::new(Duration::ZERO, -1.0);
}
