// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Sync engine configuration.
//!
//! All knobs are supplied at startup (usually from `config.toml` in the
//! daemon state directory) and never hot-reloaded. Missing fields fall back
//! to defaults, so an empty file is a valid configuration that runs the
//! engine against the simulated transport.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

/// Configuration for the outbox sync engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncConfig {
    /// Collector endpoint URL. Empty means no remote is configured and the
    /// daemon runs the simulated transport (demo/offline mode).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub endpoint: String,
    /// Bearer credential sent with every batch.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_key: String,
    /// Maximum records per dispatch attempt (default: 100).
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Scheduler cadence in seconds (default: 2).
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,
    /// Failed-attempt ceiling per record before it is parked for audit
    /// (default: 5).
    #[serde(default = "default_max_retry_attempts")]
    pub max_retry_attempts: i64,
    /// Bound on a single transport send in seconds (default: 5).
    #[serde(default = "default_transport_timeout_secs")]
    pub transport_timeout_secs: u64,
    /// How long the breaker stays offline after a connectivity failure, in
    /// seconds (default: 30).
    #[serde(default = "default_breaker_cooldown_secs")]
    pub breaker_cooldown_secs: u64,
}

fn default_batch_size() -> usize {
    100
}

fn default_sync_interval_secs() -> u64 {
    2
}

fn default_max_retry_attempts() -> i64 {
    5
}

fn default_transport_timeout_secs() -> u64 {
    5
}

fn default_breaker_cooldown_secs() -> u64 {
    30
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            endpoint: String::new(),
            api_key: String::new(),
            batch_size: default_batch_size(),
            sync_interval_secs: default_sync_interval_secs(),
            max_retry_attempts: default_max_retry_attempts(),
            transport_timeout_secs: default_transport_timeout_secs(),
            breaker_cooldown_secs: default_breaker_cooldown_secs(),
        }
    }
}

impl SyncConfig {
    /// Load configuration from a TOML file, falling back to defaults when
    /// the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(SyncConfig::default());
        }
        let contents = fs::read_to_string(path)?;
        let config: SyncConfig =
            toml::from_str(&contents).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::Config("batch_size must be at least 1".into()));
        }
        if self.max_retry_attempts < 1 {
            return Err(Error::Config("max_retry_attempts must be at least 1".into()));
        }
        if !self.endpoint.is_empty()
            && !self.endpoint.starts_with("http://")
            && !self.endpoint.starts_with("https://")
        {
            return Err(Error::Config(format!(
                "endpoint must be an http(s) URL, got '{}'",
                self.endpoint
            )));
        }
        Ok(())
    }

    /// Scheduler cadence as a [`Duration`].
    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    /// Transport send bound as a [`Duration`].
    pub fn transport_timeout(&self) -> Duration {
        Duration::from_secs(self.transport_timeout_secs)
    }

    /// Breaker cooldown as a [`Duration`].
    pub fn breaker_cooldown(&self) -> Duration {
        Duration::from_secs(self.breaker_cooldown_secs)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
