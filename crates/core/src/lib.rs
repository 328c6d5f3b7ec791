// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! obx-core: Shared library for the obx event outbox
//!
//! This crate provides the core data structures, the SQLite-backed event
//! store, the wire protocol, and configuration used by both the obx-engine
//! sync dispatcher and the obxd daemon.

pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod event;
pub mod protocol;

pub use clock::{ClockSource, SystemClock};
pub use config::SyncConfig;
pub use db::Database;
pub use error::{Error, Result};
pub use event::{EventRecord, EventStatus, SyncLogEntry, SyncStats};
pub use protocol::{BatchAck, BatchEnvelope, BatchRecord};
