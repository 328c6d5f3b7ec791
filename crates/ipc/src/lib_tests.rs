// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::panic)]

use super::*;
use serde_json::json;
use yare::parameterized;

#[parameterized(
    ping = { DaemonRequest::Ping },
    status = { DaemonRequest::Status },
    stats = { DaemonRequest::Stats },
    sync_now = { DaemonRequest::SyncNow },
    shutdown = { DaemonRequest::Shutdown },
)]
fn request_round_trips_through_framing(request: DaemonRequest) {
    let mut buf = Vec::new();
    framing::write_request(&mut buf, &request).unwrap();

    let back = framing::read_request(&mut buf.as_slice()).unwrap();
    assert_eq!(back, request);
}

#[test]
fn enqueue_request_carries_payload_verbatim() {
    let request = DaemonRequest::Enqueue {
        owner_id: "user-12".into(),
        kind: "settings_update".into(),
        payload: json!({"volume": 70, "locale": "fr"}),
    };

    let mut buf = Vec::new();
    framing::write_request(&mut buf, &request).unwrap();
    let back = framing::read_request(&mut buf.as_slice()).unwrap();

    match back {
        DaemonRequest::Enqueue { payload, .. } => {
            assert_eq!(payload["volume"], 70);
            assert_eq!(payload["locale"], "fr");
        }
        other => panic!("wrong variant: {other:?}"),
    }
}

#[test]
fn response_round_trips_through_framing() {
    let response = DaemonResponse::Status(EngineStatus {
        is_online: false,
        dispatching: true,
        last_sync_time: None,
        sync_interval_secs: 2,
    });

    let mut buf = Vec::new();
    framing::write_response(&mut buf, &response).unwrap();
    let back = framing::read_response(&mut buf.as_slice()).unwrap();
    assert_eq!(back, response);
}

#[test]
fn oversized_frame_is_rejected() {
    let len = (framing::MAX_MESSAGE_SIZE as u32 + 1).to_be_bytes();
    let err = framing::read_request(&mut len.as_slice()).unwrap_err();
    assert!(err.to_string().contains("too large"));
}

#[test]
fn truncated_frame_is_an_error() {
    let mut buf = Vec::new();
    framing::write_request(&mut buf, &DaemonRequest::Ping).unwrap();
    buf.truncate(buf.len() - 1);

    assert!(framing::read_request(&mut buf.as_slice()).is_err());
}

#[test]
fn garbage_json_is_an_error() {
    let body = b"not json";
    let mut buf = Vec::new();
    buf.extend_from_slice(&(body.len() as u32).to_be_bytes());
    buf.extend_from_slice(body);

    assert!(framing::read_request(&mut buf.as_slice()).is_err());
}

#[test]
fn request_serde_uses_type_tag() {
    let json = serde_json::to_string(&DaemonRequest::SyncNow).unwrap();
    assert_eq!(json, "{\"type\":\"SyncNow\"}");
}
