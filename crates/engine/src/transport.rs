// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Transport abstraction for batch delivery.
//!
//! Provides a trait-based transport layer that enables:
//! - Real HTTP delivery to the configured collector endpoint
//! - A simulated backend for demo/offline operation
//! - Mock transports for unit testing
//!
//! The dispatcher treats an ambiguous outcome (e.g. a timeout after the
//! collector already accepted the batch) as failure and re-sends. That is
//! the accepted at-least-once trade-off.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use obx_core::protocol::{BatchAck, BatchEnvelope};

/// Error type for transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The collector could not be reached.
    #[error("connectivity failure: {0}")]
    Connectivity(String),

    /// The send did not complete within the configured bound.
    #[error("send timed out")]
    Timeout,

    /// The collector was reached and explicitly rejected the batch.
    #[error("batch rejected by collector: {0}")]
    Rejected(String),
}

impl TransportError {
    /// True for failures that indicate the endpoint is unreachable.
    ///
    /// Only these trip the offline breaker; a rejection proves the endpoint
    /// is reachable, so scheduled sends keep flowing after one.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, TransportError::Connectivity(_) | TransportError::Timeout)
    }
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Transport trait for delivering one batch to the remote collector.
///
/// This trait abstracts over the actual transport mechanism, allowing
/// for easy testing with mock implementations.
pub trait Transport: Send + Sync {
    /// Deliver one batch envelope and wait for the collector's ack.
    ///
    /// Implementations must bound the attempt internally; a stuck endpoint
    /// surfaces as [`TransportError::Timeout`], never as an unbounded await.
    fn send(
        &self,
        envelope: &BatchEnvelope,
    ) -> Pin<Box<dyn Future<Output = TransportResult<BatchAck>> + Send + '_>>;
}

/// HTTP transport posting batch envelopes to the collector endpoint.
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

/// Fixed client-version header sent with every batch.
const CLIENT_VERSION_HEADER: &str = "x-obx-client-version";

impl HttpTransport {
    /// Create an HTTP transport for the given endpoint.
    ///
    /// `timeout` bounds each send end to end (connect + request + response).
    pub fn new(endpoint: String, api_key: String, timeout: Duration) -> TransportResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Connectivity(e.to_string()))?;

        Ok(HttpTransport { client, endpoint, api_key })
    }

    fn classify(err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::Connectivity(err.to_string())
        }
    }
}

impl Transport for HttpTransport {
    fn send(
        &self,
        envelope: &BatchEnvelope,
    ) -> Pin<Box<dyn Future<Output = TransportResult<BatchAck>> + Send + '_>> {
        let envelope = envelope.clone();
        Box::pin(async move {
            let response = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .header(CLIENT_VERSION_HEADER, env!("CARGO_PKG_VERSION"))
                .json(&envelope)
                .send()
                .await
                .map_err(Self::classify)?;

            let status = response.status();
            if status.is_client_error() {
                // The collector answered: the batch itself was refused.
                let body = response.text().await.unwrap_or_default();
                return Err(TransportError::Rejected(format!("{status}: {body}")));
            }
            if !status.is_success() {
                // 5xx and friends: the endpoint is in trouble, back off.
                return Err(TransportError::Connectivity(format!(
                    "collector returned {status}"
                )));
            }

            let ack: BatchAck = response
                .json()
                .await
                .map_err(|e| TransportError::Rejected(format!("malformed ack: {e}")))?;

            if ack.batch_id != envelope.batch_id {
                return Err(TransportError::Rejected(format!(
                    "ack for wrong batch: sent {}, got {}",
                    envelope.batch_id, ack.batch_id
                )));
            }

            Ok(ack)
        })
    }
}
