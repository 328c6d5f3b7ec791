// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Simulated transport for demo and offline operation.
//!
//! Sleeps to imitate network latency and fails a configurable fraction of
//! sends, so kiosks without a configured collector still exercise the full
//! dispatch path (retries, breaker, sync log) with no special-casing.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use rand::Rng;

use obx_core::protocol::{BatchAck, BatchEnvelope};

use crate::transport::{Transport, TransportError, TransportResult};

/// Degraded/no-op transport simulating an unreliable collector.
pub struct SimulatedTransport {
    latency: Duration,
    /// Probability in [0.0, 1.0] that a send fails with a connectivity error.
    failure_rate: f64,
}

impl SimulatedTransport {
    /// Create a simulated transport with the given latency and failure rate.
    pub fn new(latency: Duration, failure_rate: f64) -> Self {
        SimulatedTransport { latency, failure_rate: failure_rate.clamp(0.0, 1.0) }
    }
}

impl Default for SimulatedTransport {
    /// 50ms of latency, 1 in 10 sends fail.
    fn default() -> Self {
        SimulatedTransport::new(Duration::from_millis(50), 0.1)
    }
}

impl Transport for SimulatedTransport {
    fn send(
        &self,
        envelope: &BatchEnvelope,
    ) -> Pin<Box<dyn Future<Output = TransportResult<BatchAck>> + Send + '_>> {
        let batch_id = envelope.batch_id.clone();
        Box::pin(async move {
            tokio::time::sleep(self.latency).await;

            let roll: f64 = rand::thread_rng().gen();
            if roll < self.failure_rate {
                return Err(TransportError::Connectivity("simulated outage".into()));
            }

            Ok(BatchAck {
                provider_batch_id: Some(format!("sim-{batch_id}")),
                batch_id,
            })
        })
    }
}
