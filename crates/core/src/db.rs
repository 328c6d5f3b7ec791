// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! SQLite-backed store for the event outbox.
//!
//! The [`Database`] struct provides all data access for outbox records and
//! the per-batch sync log. Records are append-only: the dispatcher flips
//! their status, nothing deletes them.
//!
//! Batch status updates run inside a single SQLite transaction, so a crash
//! mid-update rolls the whole batch back and every record stays selectable.
//! That is the recovery story: anything not durably marked `synced` is
//! re-sent, trading duplicate delivery for zero loss.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use crate::error::{Error, Result};
use crate::event::{EventRecord, EventStatus, SyncLogEntry, SyncStats};

/// SQL schema for the outbox database.
pub const SCHEMA: &str = r#"
-- Durable outbox of locally captured events
CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    owner_id TEXT NOT NULL,
    kind TEXT NOT NULL,
    payload TEXT NOT NULL,
    created_at_ms INTEGER NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    retry_count INTEGER NOT NULL DEFAULT 0,
    CHECK (status IN ('pending', 'synced', 'failed')),
    CHECK (retry_count >= 0)
);

-- Append-only audit log, one row per dispatch attempt
CREATE TABLE IF NOT EXISTS sync_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    batch_id TEXT NOT NULL,
    record_count INTEGER NOT NULL,
    success INTEGER NOT NULL,
    error TEXT,
    duration_ms INTEGER NOT NULL,
    created_at TEXT NOT NULL
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_events_status ON events(status);
CREATE INDEX IF NOT EXISTS idx_events_kind ON events(kind);
CREATE INDEX IF NOT EXISTS idx_sync_log_batch ON sync_log(batch_id);
"#;

/// Parse an RFC3339 timestamp from the database.
fn parse_timestamp(
    value: &str,
    column: &str,
) -> std::result::Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                Box::new(Error::CorruptedData(format!(
                    "invalid timestamp '{value}' in column '{column}'"
                ))),
            )
        })
}

/// Parse a stored status string into an [`EventStatus`].
fn parse_status(value: &str) -> std::result::Result<EventStatus, rusqlite::Error> {
    value.parse().map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            Box::new(Error::CorruptedData(format!(
                "invalid value '{value}' in column 'status'"
            ))),
        )
    })
}

/// Parse a stored payload string back into a JSON value.
fn parse_payload(value: &str) -> std::result::Result<serde_json::Value, rusqlite::Error> {
    serde_json::from_str(value).map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            Box::new(Error::CorruptedData(format!(
                "invalid payload JSON in column 'payload': '{value}'"
            ))),
        )
    })
}

/// Run schema creation and all migrations on a database connection.
///
/// This is the single migration path for all crates (core, engine, daemon).
/// It applies the canonical schema and runs idempotent migrations to upgrade
/// older databases that may be missing columns.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    migrate_add_retry_count(conn)?;
    Ok(())
}

/// Migration: Add retry_count column to existing databases.
///
/// Early deployments stored the outbox without retry accounting.
fn migrate_add_retry_count(conn: &Connection) -> Result<()> {
    let has_column: bool = conn
        .query_row(
            "SELECT COUNT(*) > 0 FROM pragma_table_info('events') WHERE name = 'retry_count'",
            [],
            |row| row.get(0),
        )
        .unwrap_or(false);

    if !has_column {
        conn.execute(
            "ALTER TABLE events ADD COLUMN retry_count INTEGER NOT NULL DEFAULT 0",
            [],
        )?;
    }
    Ok(())
}

/// Map a database row to an [`EventRecord`].
///
/// Expects columns in the order: id, owner_id, kind, payload, created_at_ms,
/// status, retry_count.
fn row_to_record(row: &rusqlite::Row<'_>) -> std::result::Result<EventRecord, rusqlite::Error> {
    let payload_str: String = row.get(3)?;
    let status_str: String = row.get(5)?;
    Ok(EventRecord {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        kind: row.get(2)?,
        payload: parse_payload(&payload_str)?,
        created_at_ms: row.get(4)?,
        status: parse_status(&status_str)?,
        retry_count: row.get(6)?,
    })
}

const RECORD_COLUMNS: &str = "id, owner_id, kind, payload, created_at_ms, status, retry_count";

/// SQLite database connection with outbox operations.
pub struct Database {
    /// The underlying SQLite connection.
    pub conn: Connection,
}

impl Database {
    /// Open a database connection at the given path, creating and migrating if needed.
    pub fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        // WAL mode for concurrency between the dispatcher and enqueue path
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )?;

        let db = Database { conn };
        run_migrations(&db.conn)?;
        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        run_migrations(&db.conn)?;
        Ok(db)
    }

    /// Insert a new pending event record and return its assigned id.
    ///
    /// `payload` must already be serialized; it is stored verbatim.
    pub fn insert_event(
        &self,
        owner_id: &str,
        kind: &str,
        payload: &str,
        created_at_ms: i64,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO events (owner_id, kind, payload, created_at_ms, status, retry_count)
             VALUES (?1, ?2, ?3, ?4, 'pending', 0)",
            params![owner_id, kind, payload, created_at_ms],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Get a single event record by id.
    pub fn get_event(&self, id: i64) -> Result<EventRecord> {
        let record = self
            .conn
            .query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM events WHERE id = ?1"),
                params![id],
                row_to_record,
            )
            .optional()?;

        record.ok_or(Error::EventNotFound(id))
    }

    /// Select up to `batch_size` records eligible for delivery, oldest first.
    ///
    /// Eligible means `pending`, or `failed` with fewer than
    /// `max_retry_attempts` failed attempts. Records past the ceiling are
    /// skipped silently; `synced` records are never returned.
    pub fn select_batch(&self, batch_size: usize, max_retry_attempts: i64) -> Result<Vec<EventRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM events
             WHERE status = 'pending' OR (status = 'failed' AND retry_count < ?1)
             ORDER BY id ASC LIMIT ?2"
        ))?;

        let limit = i64::try_from(batch_size).unwrap_or(i64::MAX);
        let records = stmt
            .query_map(params![max_retry_attempts, limit], row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Mark every record in the batch `synced`, atomically.
    ///
    /// `synced` is terminal: the update only touches rows that are not
    /// already synced, so replaying a batch after a crash is harmless.
    pub fn mark_batch_synced(&mut self, ids: &[i64]) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "UPDATE events SET status = 'synced' WHERE id = ?1 AND status != 'synced'",
            )?;
            for id in ids {
                stmt.execute(params![id])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Mark every record in the batch `failed` and bump its retry count by
    /// exactly 1, atomically.
    ///
    /// Transport failure is batch-atomic blame: every record in the failed
    /// batch gets one increment, regardless of which record caused it.
    pub fn mark_batch_failed(&mut self, ids: &[i64]) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "UPDATE events SET status = 'failed', retry_count = retry_count + 1
                 WHERE id = ?1 AND status != 'synced'",
            )?;
            for id in ids {
                stmt.execute(params![id])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Get outbox counters for the observability surface.
    pub fn stats(&self, max_retry_attempts: i64) -> Result<SyncStats> {
        self.conn
            .query_row(
                "SELECT COUNT(*),
                        SUM(status = 'pending'),
                        SUM(status = 'synced'),
                        SUM(status = 'failed' AND retry_count < ?1),
                        SUM(status = 'failed' AND retry_count >= ?1)
                 FROM events",
                params![max_retry_attempts],
                |row| {
                    Ok(SyncStats {
                        total: row.get(0)?,
                        pending: row.get::<_, Option<i64>>(1)?.unwrap_or(0),
                        synced: row.get::<_, Option<i64>>(2)?.unwrap_or(0),
                        failed: row.get::<_, Option<i64>>(3)?.unwrap_or(0),
                        terminal_failed: row.get::<_, Option<i64>>(4)?.unwrap_or(0),
                    })
                },
            )
            .map_err(Error::from)
    }

    /// Append one sync log row describing a dispatch attempt.
    pub fn append_sync_log(
        &self,
        batch_id: &str,
        record_count: usize,
        success: bool,
        error: Option<&str>,
        duration_ms: i64,
    ) -> Result<i64> {
        let count = i64::try_from(record_count).unwrap_or(i64::MAX);
        self.conn.execute(
            "INSERT INTO sync_log (batch_id, record_count, success, error, duration_ms, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                batch_id,
                count,
                success,
                error,
                duration_ms,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Get the most recent sync log entries, newest first.
    pub fn recent_sync_log(&self, limit: usize) -> Result<Vec<SyncLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, batch_id, record_count, success, error, duration_ms, created_at
             FROM sync_log ORDER BY id DESC LIMIT ?1",
        )?;

        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let entries = stmt
            .query_map(params![limit_i64], |row| {
                let created_str: String = row.get(6)?;
                Ok(SyncLogEntry {
                    id: row.get(0)?,
                    batch_id: row.get(1)?,
                    record_count: row.get(2)?,
                    success: row.get(3)?,
                    error: row.get(4)?,
                    duration_ms: row.get(5)?,
                    created_at: parse_timestamp(&created_str, "created_at")?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    /// Count sync log rows (for tests and housekeeping checks).
    pub fn sync_log_len(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM sync_log", [], |row| row.get(0))?;
        Ok(count)
    }
}

#[cfg(test)]
#[path = "db_tests.rs"]
mod tests;
