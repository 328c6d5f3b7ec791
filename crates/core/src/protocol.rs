// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Wire protocol between the dispatcher and the remote collector.
//!
//! A dispatch attempt sends one [`BatchEnvelope`] and expects one
//! [`BatchAck`] echoing the batch id. The payload of each record travels
//! verbatim; the collector, like the engine, treats it as opaque.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::EventRecord;

/// Envelope for one delivery attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchEnvelope {
    /// Unique id for this attempt, never reused across attempts.
    pub batch_id: String,
    /// When the envelope was built.
    pub timestamp: DateTime<Utc>,
    /// Record snapshots in ascending id order.
    pub records: Vec<BatchRecord>,
}

/// Snapshot of one outbox record as sent over the wire.
///
/// Local delivery state (`status`, `retry_count`) stays local.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchRecord {
    pub id: i64,
    pub owner_id: String,
    pub kind: String,
    pub payload: serde_json::Value,
    pub created_at_ms: i64,
}

impl From<&EventRecord> for BatchRecord {
    fn from(record: &EventRecord) -> Self {
        BatchRecord {
            id: record.id,
            owner_id: record.owner_id.clone(),
            kind: record.kind.clone(),
            payload: record.payload.clone(),
            created_at_ms: record.created_at_ms,
        }
    }
}

/// Acknowledgment returned by the collector for an accepted batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchAck {
    /// Echoed batch id.
    pub batch_id: String,
    /// Collector-side id for the stored batch, when the backend assigns one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_batch_id: Option<String>,
}

impl BatchEnvelope {
    /// Build an envelope from selected records. Order is preserved.
    pub fn new(batch_id: String, records: &[EventRecord]) -> Self {
        BatchEnvelope {
            batch_id,
            timestamp: Utc::now(),
            records: records.iter().map(BatchRecord::from).collect(),
        }
    }

    /// Ids of every record in this envelope, in wire order.
    pub fn record_ids(&self) -> Vec<i64> {
        self.records.iter().map(|r| r.id).collect()
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
