// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! obx-ipc: Daemon protocol for the obx outbox.
//!
//! Kiosk processes (UI shell, launcher, auth hooks) talk to obxd over a Unix
//! socket. Messages are serialized as JSON with length-prefixed framing.
//! Enqueue is the only write path; everything else is read-only or control.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use obx_core::event::{SyncLogEntry, SyncStats};

/// Request sent from a kiosk process to the daemon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum DaemonRequest {
    /// Ping to check if the daemon is alive.
    Ping,
    /// Version handshake request.
    Hello { version: String },
    /// Get engine status.
    Status,
    /// Get outbox counters.
    Stats,
    /// Capture one application event into the outbox.
    Enqueue {
        owner_id: String,
        kind: String,
        payload: serde_json::Value,
    },
    /// Request an immediate dispatch attempt.
    SyncNow,
    /// Get the most recent dispatch attempts.
    RecentLog { limit: usize },
    /// Graceful shutdown.
    Shutdown,
}

/// Response sent from the daemon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum DaemonResponse {
    /// Pong response.
    Pong,
    /// Version handshake response.
    Hello { version: String },
    /// Engine status.
    Status(EngineStatus),
    /// Outbox counters.
    Stats(SyncStats),
    /// Event accepted into the outbox.
    Enqueued { id: i64 },
    /// An immediate dispatch attempt was requested.
    SyncScheduled,
    /// Recent dispatch attempts, newest first.
    Log { entries: Vec<SyncLogEntry> },
    /// Error response.
    Error { message: String },
    /// Shutdown acknowledged.
    ShuttingDown,
}

/// Engine status as reported over IPC.
///
/// Mirrors the engine's status struct; redeclared here so the IPC protocol
/// crate stays decoupled from the engine internals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineStatus {
    /// Circuit breaker signal.
    pub is_online: bool,
    /// Whether a dispatch is currently in flight.
    pub dispatching: bool,
    /// Completion time of the last successful batch, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sync_time: Option<DateTime<Utc>>,
    /// Scheduler cadence in seconds.
    pub sync_interval_secs: u64,
}

/// IPC message framing.
///
/// Messages are framed as:
/// - 4 bytes: message length (big-endian u32)
/// - N bytes: JSON-encoded message
pub mod framing {
    use std::io::{Read, Write};

    use super::*;

    /// Maximum message size (1MB) to prevent malformed frames from causing hangs.
    pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

    fn read_frame<R: Read>(reader: &mut R) -> std::io::Result<Vec<u8>> {
        let mut len_buf = [0u8; 4];
        reader.read_exact(&mut len_buf)?;
        let len = u32::from_be_bytes(len_buf) as usize;

        if len > MAX_MESSAGE_SIZE {
            return Err(std::io::Error::other(format!(
                "message too large: {} bytes (max {})",
                len, MAX_MESSAGE_SIZE
            )));
        }

        let mut buf = vec![0u8; len];
        reader.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn write_frame<W: Write>(writer: &mut W, json: &[u8]) -> std::io::Result<()> {
        let len =
            u32::try_from(json.len()).map_err(|_| std::io::Error::other("message too large"))?;
        writer.write_all(&len.to_be_bytes())?;
        writer.write_all(json)?;
        writer.flush()?;
        Ok(())
    }

    /// Read a request from the given reader.
    pub fn read_request<R: Read>(reader: &mut R) -> std::io::Result<DaemonRequest> {
        let buf = read_frame(reader)?;
        serde_json::from_slice(&buf)
            .map_err(|e| std::io::Error::other(format!("deserialize error: {}", e)))
    }

    /// Write a request to the given writer.
    pub fn write_request<W: Write>(writer: &mut W, request: &DaemonRequest) -> std::io::Result<()> {
        let json = serde_json::to_vec(request)
            .map_err(|e| std::io::Error::other(format!("serialize error: {}", e)))?;
        write_frame(writer, &json)
    }

    /// Read a response from the given reader.
    pub fn read_response<R: Read>(reader: &mut R) -> std::io::Result<DaemonResponse> {
        let buf = read_frame(reader)?;
        serde_json::from_slice(&buf)
            .map_err(|e| std::io::Error::other(format!("deserialize error: {}", e)))
    }

    /// Write a response to the given writer.
    pub fn write_response<W: Write>(
        writer: &mut W,
        response: &DaemonResponse,
    ) -> std::io::Result<()> {
        let json = serde_json::to_vec(response)
            .map_err(|e| std::io::Error::other(format!("serialize error: {}", e)))?;
        write_frame(writer, &json)
    }
}

/// Blocking client helper for kiosk processes.
#[cfg(unix)]
pub mod client {
    use std::os::unix::net::UnixStream;
    use std::path::Path;
    use std::time::Duration;

    use super::framing;
    use super::{DaemonRequest, DaemonResponse};

    /// Send one request over the daemon socket and wait for the response.
    pub fn request(socket_path: &Path, request: &DaemonRequest) -> std::io::Result<DaemonResponse> {
        let mut stream = UnixStream::connect(socket_path)?;
        stream.set_read_timeout(Some(Duration::from_secs(5)))?;
        stream.set_write_timeout(Some(Duration::from_secs(5)))?;

        framing::write_request(&mut stream, request)?;
        framing::read_response(&mut stream)
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
