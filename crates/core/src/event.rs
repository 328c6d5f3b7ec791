// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Core event types for the obx outbox.
//!
//! This module contains the fundamental data types: EventRecord, EventStatus,
//! SyncLogEntry, and SyncStats.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Delivery status of an outbox record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Captured locally, awaiting delivery. Initial state for new records.
    Pending,
    /// Accepted by the remote endpoint. Terminal; never selected again.
    Synced,
    /// A delivery attempt that included this record failed. Selectable again
    /// until `retry_count` reaches the configured ceiling.
    Failed,
}

impl EventStatus {
    /// Returns the string representation used in storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Pending => "pending",
            EventStatus::Synced => "synced",
            EventStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(EventStatus::Pending),
            "synced" => Ok(EventStatus::Synced),
            "failed" => Ok(EventStatus::Failed),
            _ => Err(Error::InvalidStatus(s.to_string())),
        }
    }
}

/// A single durable outbox record.
///
/// Records are created only by the enqueue path (as `Pending`), flipped to
/// `Synced` or `Failed` only by the dispatcher, and never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventRecord {
    /// Monotonically increasing local identifier, assigned at insertion.
    pub id: i64,
    /// Identifier of the originating actor (a user id or "system").
    pub owner_id: String,
    /// Semantic tag of the event ("app_launch", "authentication", ...).
    pub kind: String,
    /// Opaque payload, stored verbatim. The engine never interprets it.
    pub payload: serde_json::Value,
    /// Capture timestamp in milliseconds since Unix epoch, set once.
    pub created_at_ms: i64,
    /// Delivery status.
    pub status: EventStatus,
    /// Number of failed delivery attempts that included this record.
    pub retry_count: i64,
}

impl EventRecord {
    /// Returns true if this record is eligible for batch selection under the
    /// given retry ceiling.
    pub fn is_eligible(&self, max_retry_attempts: i64) -> bool {
        match self.status {
            EventStatus::Pending => true,
            EventStatus::Synced => false,
            EventStatus::Failed => self.retry_count < max_retry_attempts,
        }
    }
}

/// One row of the append-only per-batch audit log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncLogEntry {
    /// Row id, assigned at insertion.
    pub id: i64,
    /// Batch identifier, unique per dispatch attempt.
    pub batch_id: String,
    /// Number of records in the batch.
    pub record_count: i64,
    /// Whether the remote endpoint accepted the batch.
    pub success: bool,
    /// Error detail for failed attempts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall-clock duration of the attempt in milliseconds.
    pub duration_ms: i64,
    /// When the attempt completed.
    pub created_at: DateTime<Utc>,
}

/// Read-only outbox counters, consumed by dashboards.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncStats {
    /// Total records ever enqueued.
    pub total: i64,
    /// Records awaiting a first delivery attempt.
    pub pending: i64,
    /// Records accepted by the remote endpoint.
    pub synced: i64,
    /// Records with at least one failed attempt, still retryable.
    pub failed: i64,
    /// Failed records that exhausted the retry ceiling (audit only).
    pub terminal_failed: i64,
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
