// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The sync engine: enqueue path, dispatch state machine, and the
//! observability surface.
//!
//! One [`SyncEngine`] instance owns the store, the transport, the breaker,
//! and all mutable counters; there is no ambient state. The dispatch path is
//! guarded by an atomic flag, so any number of concurrent triggers (timer
//! tick, enqueue kick, explicit sync) collapse into at most one in-flight
//! attempt.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use uuid::Uuid;

use obx_core::clock::{ClockSource, SystemClock};
use obx_core::config::SyncConfig;
use obx_core::db::Database;
use obx_core::error::{Error, Result};
use obx_core::event::{SyncLogEntry, SyncStats};
use obx_core::protocol::BatchEnvelope;

use crate::breaker::CircuitBreaker;
use crate::transport::Transport;

/// Outcome of one dispatch trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Another dispatch is in flight; this trigger was a no-op.
    AlreadyRunning,
    /// The breaker is offline; nothing was selected or sent.
    Offline,
    /// No eligible records; the transport was not contacted.
    NothingToSync,
    /// A batch was sent; `success` reports the transport outcome.
    Completed { records: usize, success: bool },
}

/// Read-only engine status for dashboards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineStatus {
    pub is_online: bool,
    pub dispatching: bool,
    pub last_sync_time: Option<DateTime<Utc>>,
    pub sync_interval_secs: u64,
}

/// Clears the dispatching flag on every exit path, including errors.
struct DispatchGuard<'a>(&'a AtomicBool);

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Durable outbox sync engine.
pub struct SyncEngine {
    db: Mutex<Database>,
    transport: Box<dyn Transport>,
    breaker: CircuitBreaker,
    config: SyncConfig,
    clock: Arc<dyn ClockSource>,
    dispatching: AtomicBool,
    /// Epoch millis of the last dispatch attempt (any outcome). 0 = never.
    last_attempt_ms: AtomicI64,
    /// Epoch millis of the last successful batch. 0 = never.
    last_sync_ms: AtomicI64,
}

impl SyncEngine {
    /// Create an engine over the given store and transport.
    pub fn new(db: Database, transport: Box<dyn Transport>, config: SyncConfig) -> Self {
        Self::with_clock(db, transport, config, Arc::new(SystemClock))
    }

    /// Create an engine with a custom clock source (for testing).
    pub fn with_clock(
        db: Database,
        transport: Box<dyn Transport>,
        config: SyncConfig,
        clock: Arc<dyn ClockSource>,
    ) -> Self {
        let breaker = CircuitBreaker::new(config.breaker_cooldown(), Arc::clone(&clock));
        SyncEngine {
            db: Mutex::new(db),
            transport,
            breaker,
            config,
            clock,
            dispatching: AtomicBool::new(false),
            last_attempt_ms: AtomicI64::new(0),
            last_sync_ms: AtomicI64::new(0),
        }
    }

    /// The engine's static configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Accept one application event into the outbox.
    ///
    /// Validates and serializes first, then durably inserts one `pending`
    /// record and returns its id. Enqueue success is independent of sync
    /// state: downstream failures never surface here. Callers that want
    /// near-real-time delivery follow up with a scheduler kick.
    pub fn enqueue<T: Serialize>(&self, owner_id: &str, kind: &str, payload: &T) -> Result<i64> {
        if owner_id.trim().is_empty() {
            return Err(Error::Validation("owner_id must not be empty".into()));
        }
        if kind.trim().is_empty() {
            return Err(Error::Validation("kind must not be empty".into()));
        }
        let payload_json = serde_json::to_string(payload)
            .map_err(|e| Error::Validation(format!("payload not serializable: {e}")))?;

        let created_at_ms = self.clock.now_ms() as i64;
        let id = self.db.lock().insert_event(owner_id, kind, &payload_json, created_at_ms)?;

        tracing::debug!(id, owner_id, kind, "event enqueued");
        Ok(id)
    }

    /// Scheduled dispatch trigger. Honors the offline breaker.
    pub async fn dispatch_once(&self) -> Result<DispatchOutcome> {
        self.dispatch(false).await
    }

    /// Explicit "sync now" trigger.
    ///
    /// Attempts a real send even while the breaker is offline; a success
    /// flips the breaker back online immediately.
    pub async fn sync_now(&self) -> Result<DispatchOutcome> {
        self.dispatch(true).await
    }

    async fn dispatch(&self, explicit: bool) -> Result<DispatchOutcome> {
        // Collapse concurrent triggers: exactly one dispatch at a time.
        if self
            .dispatching
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("dispatch already in progress");
            return Ok(DispatchOutcome::AlreadyRunning);
        }
        let _guard = DispatchGuard(&self.dispatching);
        self.last_attempt_ms.store(self.clock.now_ms() as i64, Ordering::Release);

        if !explicit && !self.breaker.is_online() {
            tracing::debug!("skipping dispatch: offline");
            return Ok(DispatchOutcome::Offline);
        }

        let batch = self
            .db
            .lock()
            .select_batch(self.config.batch_size, self.config.max_retry_attempts)?;
        if batch.is_empty() {
            tracing::debug!("nothing to sync");
            return Ok(DispatchOutcome::NothingToSync);
        }

        let envelope = BatchEnvelope::new(Uuid::new_v4().to_string(), &batch);
        let ids = envelope.record_ids();
        let started = Instant::now();
        let result = self.transport.send(&envelope).await;
        let duration_ms = i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX);
        let success = result.is_ok();
        let error_msg = result.as_ref().err().map(|e| e.to_string());

        // Batch-atomic status flip plus the audit row. A crash before this
        // point leaves every record selectable; after it, the outcome is
        // durable.
        {
            let mut db = self.db.lock();
            if success {
                db.mark_batch_synced(&ids)?;
            } else {
                db.mark_batch_failed(&ids)?;
            }
            db.append_sync_log(
                &envelope.batch_id,
                ids.len(),
                success,
                error_msg.as_deref(),
                duration_ms,
            )?;
        }

        match &result {
            Ok(ack) => {
                self.breaker.reset();
                self.last_sync_ms.store(self.clock.now_ms() as i64, Ordering::Release);
                tracing::info!(
                    batch_id = %envelope.batch_id,
                    records = ids.len(),
                    duration_ms,
                    provider_batch_id = ack.provider_batch_id.as_deref().unwrap_or(""),
                    "batch synced"
                );
            }
            Err(err) => {
                if err.is_connectivity() {
                    self.breaker.trip();
                }
                tracing::warn!(
                    batch_id = %envelope.batch_id,
                    records = ids.len(),
                    duration_ms,
                    error = %err,
                    "batch delivery failed"
                );
            }
        }

        Ok(DispatchOutcome::Completed { records: ids.len(), success })
    }

    /// True if a dispatch is currently in flight.
    pub fn is_dispatching(&self) -> bool {
        self.dispatching.load(Ordering::Acquire)
    }

    /// True if the breaker currently reports online.
    pub fn is_online(&self) -> bool {
        self.breaker.is_online()
    }

    /// True once `sync_interval` has elapsed since the last dispatch
    /// attempt. Used by the scheduler to gate timer ticks; explicit kicks
    /// bypass this.
    pub fn interval_elapsed(&self) -> bool {
        let last = self.last_attempt_ms.load(Ordering::Acquire);
        if last == 0 {
            return true;
        }
        let elapsed = (self.clock.now_ms() as i64).saturating_sub(last);
        elapsed >= self.config.sync_interval().as_millis() as i64
    }

    /// Read-only status for the observability surface.
    pub fn status(&self) -> EngineStatus {
        let last_sync = self.last_sync_ms.load(Ordering::Acquire);
        EngineStatus {
            is_online: self.breaker.is_online(),
            dispatching: self.is_dispatching(),
            last_sync_time: (last_sync > 0)
                .then(|| Utc.timestamp_millis_opt(last_sync).single())
                .flatten(),
            sync_interval_secs: self.config.sync_interval_secs,
        }
    }

    /// Outbox counters.
    pub fn stats(&self) -> Result<SyncStats> {
        self.db.lock().stats(self.config.max_retry_attempts)
    }

    /// Most recent dispatch attempts, newest first.
    pub fn recent_log(&self, limit: usize) -> Result<Vec<SyncLogEntry>> {
        self.db.lock().recent_sync_log(limit)
    }

    /// Direct store access for crash-scenario tests.
    #[cfg(test)]
    pub(crate) fn db(&self) -> parking_lot::MutexGuard<'_, Database> {
        self.db.lock()
    }
}
