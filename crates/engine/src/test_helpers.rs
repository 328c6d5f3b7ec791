// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for engine tests.

#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use obx_core::clock::ClockSource;
use obx_core::config::SyncConfig;
use obx_core::db::Database;
use obx_core::protocol::{BatchAck, BatchEnvelope};

use crate::engine::SyncEngine;
use crate::transport::{Transport, TransportError, TransportResult};

/// Manually advanced clock for breaker and scheduler-gate tests.
pub struct ManualClock {
    ms: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Arc<Self> {
        Arc::new(ManualClock { ms: AtomicU64::new(start_ms) })
    }

    pub fn advance(&self, delta_ms: u64) {
        self.ms.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl ClockSource for ManualClock {
    fn now_ms(&self) -> u64 {
        self.ms.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct MockState {
    /// Scripted outcomes, popped per send. Empty script means success.
    outcomes: Mutex<VecDeque<Result<(), TransportError>>>,
    /// Every envelope the dispatcher handed us, in send order.
    sent: Mutex<Vec<BatchEnvelope>>,
    /// When set, the next send blocks until notified (for in-flight tests).
    gate: Mutex<Option<Arc<Notify>>>,
}

/// Mock transport with scripted outcomes and captured envelopes.
///
/// Clones share state, so tests keep a handle after boxing one copy into
/// the engine.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<MockState>,
}

impl MockTransport {
    pub fn new() -> Self {
        MockTransport::default()
    }

    /// Script the outcome of the next unscripted send.
    pub fn push_outcome(&self, outcome: Result<(), TransportError>) {
        self.state.outcomes.lock().unwrap().push_back(outcome);
    }

    /// Make the next send fail with the given error.
    pub fn fail_next(&self, err: TransportError) {
        self.push_outcome(Err(err));
    }

    /// Hold the next send open; the returned notify releases it.
    pub fn hold_next(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.state.gate.lock().unwrap() = Some(Arc::clone(&notify));
        notify
    }

    /// All envelopes sent so far.
    pub fn sent(&self) -> Vec<BatchEnvelope> {
        self.state.sent.lock().unwrap().clone()
    }

    /// Record ids per sent envelope, in send order.
    pub fn sent_ids(&self) -> Vec<Vec<i64>> {
        self.sent().iter().map(|e| e.record_ids()).collect()
    }

    pub fn send_count(&self) -> usize {
        self.state.sent.lock().unwrap().len()
    }
}

impl Transport for MockTransport {
    fn send(
        &self,
        envelope: &BatchEnvelope,
    ) -> Pin<Box<dyn Future<Output = TransportResult<BatchAck>> + Send + '_>> {
        let envelope = envelope.clone();
        let state = Arc::clone(&self.state);
        Box::pin(async move {
            let gate = state.gate.lock().unwrap().take();
            if let Some(gate) = gate {
                gate.notified().await;
            }

            state.sent.lock().unwrap().push(envelope.clone());

            let outcome = state.outcomes.lock().unwrap().pop_front();
            match outcome {
                Some(Err(err)) => Err(err),
                _ => Ok(BatchAck { batch_id: envelope.batch_id, provider_batch_id: None }),
            }
        })
    }
}

/// Engine over an in-memory store, a mock transport, and a manual clock.
pub fn make_engine(config: SyncConfig) -> (Arc<SyncEngine>, MockTransport, Arc<ManualClock>) {
    let db = Database::open_in_memory().unwrap();
    let transport = MockTransport::new();
    let clock = ManualClock::new(1_700_000_000_000);
    let engine = SyncEngine::with_clock(
        db,
        Box::new(transport.clone()),
        config,
        Arc::<ManualClock>::clone(&clock),
    );
    (Arc::new(engine), transport, clock)
}

/// Default test config: small batches, short cadence, low retry ceiling.
pub fn test_config() -> SyncConfig {
    SyncConfig {
        batch_size: 10,
        sync_interval_secs: 2,
        max_retry_attempts: 3,
        transport_timeout_secs: 5,
        breaker_cooldown_secs: 30,
        ..SyncConfig::default()
    }
}
