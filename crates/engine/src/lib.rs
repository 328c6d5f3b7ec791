// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! obx-engine: Sync dispatcher for the obx event outbox.
//!
//! Delivers durably captured events to a remote collector with at-least-once
//! semantics, bounded retries, and an online/offline circuit breaker.
//!
//! # Architecture
//!
//! ```text
//! enqueue() ──► ┌─────────────┐      ┌─────────────┐      ┌───────────┐
//!               │ Event store │ ◄──► │  SyncEngine │ ───► │ Transport │
//!               │  (SQLite)   │      │ (dispatch)  │ ◄─── │  (trait)  │
//!               └─────────────┘      └──────┬──────┘      └───────────┘
//!                                           ▲
//!                                    ┌──────┴──────┐
//!                                    │  Scheduler  │  (tick + kick)
//!                                    └─────────────┘
//! ```
//!
//! # Guarantees
//!
//! - Durability first: an enqueued event is on disk before the call returns.
//! - At most one dispatch in flight, enforced by an atomic flag; concurrent
//!   triggers collapse instead of queueing.
//! - Batch-atomic status updates; a torn attempt is re-sent, never lost.
//! - Connectivity failures trip a time-based breaker that short-circuits
//!   scheduled dispatches until the cooldown elapses.

mod breaker;
mod engine;
mod scheduler;
mod simulated;
mod transport;

pub use breaker::CircuitBreaker;
pub use engine::{DispatchOutcome, EngineStatus, SyncEngine};
pub use scheduler::{Scheduler, SchedulerHandle};
pub use simulated::SimulatedTransport;
pub use transport::{HttpTransport, Transport, TransportError, TransportResult};

#[cfg(test)]
mod test_helpers;

#[cfg(test)]
mod breaker_tests;



#[cfg(test)]
mod simulated_tests;

#[cfg(test)]
mod transport_tests;
