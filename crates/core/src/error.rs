// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for obx-core operations.

use thiserror::Error;

/// All possible errors that can occur in obx-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("event not found: {0}")]
    EventNotFound(i64),

    #[error("invalid event: {0}")]
    Validation(String),

    #[error("invalid event status: '{0}'\n  hint: valid statuses are: pending, synced, failed")]
    InvalidStatus(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("corrupted data: {0}")]
    CorruptedData(String),
}

/// A specialized Result type for obx-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
