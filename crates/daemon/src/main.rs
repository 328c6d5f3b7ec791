// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! obxd - The obx outbox daemon.
//!
//! Owns the SQLite event store at `~/.local/state/obx/`, runs the sync
//! scheduler on a background runtime, and listens on a Unix socket for IPC
//! from client processes.
//!
//! Usage:
//!   obxd --state-dir <path>

use std::fs;
use std::io::Write;
use std::os::unix::net::UnixListener;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use obx_core::{Database, SyncConfig};
use obx_engine::{HttpTransport, Scheduler, SchedulerHandle, SimulatedTransport, SyncEngine};
use obx_ipc::{framing, DaemonRequest, DaemonResponse};

mod env;

/// Socket filename within the state directory.
const SOCKET_NAME: &str = "daemon.sock";
/// PID filename within the state directory.
const PID_NAME: &str = "daemon.pid";
/// Lock filename for single instance guarantee.
const LOCK_NAME: &str = "daemon.lock";
/// Event store filename within the state directory.
const DB_NAME: &str = "outbox.db";
/// Configuration filename within the state directory.
const CONFIG_NAME: &str = "config.toml";

fn main() {
    // Parse args
    let args: Vec<String> = std::env::args().collect();
    let state_dir = parse_state_dir(&args);
    if let Err(e) = fs::create_dir_all(&state_dir) {
        eprintln!("failed to create state dir {}: {}", state_dir.display(), e);
        std::process::exit(1);
    }

    // Set up logging
    let log_path = state_dir.join("daemon.log");
    setup_logging(&log_path);

    tracing::info!("obxd starting, state_dir={}", state_dir.display());

    // Acquire file lock for single instance
    let lock_path = state_dir.join(LOCK_NAME);
    let lock_file = match acquire_lock(&lock_path) {
        Ok(f) => f,
        Err(e) => {
            tracing::error!("failed to acquire lock: {}", e);
            std::process::exit(1);
        }
    };

    // Write PID file
    let pid_path = state_dir.join(PID_NAME);
    if let Err(e) = write_pid_file(&pid_path) {
        tracing::error!("failed to write PID file: {}", e);
        std::process::exit(1);
    }

    // Load config and open the event store
    let config = match SyncConfig::load(&state_dir.join(CONFIG_NAME)) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("failed to load config: {}", e);
            std::process::exit(1);
        }
    };
    let db = match Database::open(&state_dir.join(DB_NAME)) {
        Ok(db) => db,
        Err(e) => {
            tracing::error!("failed to open event store: {}", e);
            std::process::exit(1);
        }
    };

    let engine = match build_engine(db, config) {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            tracing::error!("failed to build sync engine: {}", e);
            std::process::exit(1);
        }
    };

    // Run the scheduler on a background runtime; the accept loop below
    // stays blocking on the main thread.
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };
    let scheduler = {
        let _guard = runtime.enter();
        Scheduler::spawn(Arc::clone(&engine))
    };

    // Bind Unix socket
    let socket_path = state_dir.join(SOCKET_NAME);
    // Remove stale socket if it exists
    let _ = fs::remove_file(&socket_path);

    let listener = match UnixListener::bind(&socket_path) {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("failed to bind socket: {}", e);
            cleanup(&pid_path, &socket_path);
            std::process::exit(1);
        }
    };

    tracing::info!("listening on {}", socket_path.display());

    // Signal readiness to parent process
    println!("READY");
    // Flush stdout so parent sees READY immediately
    let _ = std::io::stdout().flush();

    // Accept connections
    for stream in listener.incoming() {
        match stream {
            Ok(mut stream) => {
                let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(5)));
                let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(5)));

                match framing::read_request(&mut stream) {
                    Ok(request) => {
                        let response = handle_request(request, &engine, &scheduler);
                        let should_shutdown = matches!(response, DaemonResponse::ShuttingDown);
                        let _ = framing::write_response(&mut stream, &response);
                        if should_shutdown {
                            tracing::info!("shutting down");
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!("failed to read request: {}", e);
                    }
                }
            }
            Err(e) => {
                tracing::warn!("failed to accept connection: {}", e);
            }
        }
    }

    // Stop the scheduler before tearing down state
    runtime.block_on(scheduler.shutdown());

    // Cleanup
    cleanup(&pid_path, &socket_path);
    drop(lock_file);
    tracing::info!("obxd stopped");
}

/// Wire the configured transport into a [`SyncEngine`].
///
/// An empty endpoint selects the simulated transport, so a fresh state
/// directory runs end to end without any remote collector.
fn build_engine(db: Database, config: SyncConfig) -> Result<SyncEngine, String> {
    if config.endpoint.is_empty() {
        tracing::info!("no endpoint configured, using simulated transport");
        return Ok(SyncEngine::new(db, Box::new(SimulatedTransport::default()), config));
    }
    let transport = HttpTransport::new(
        config.endpoint.clone(),
        config.api_key.clone(),
        config.transport_timeout(),
    )
    .map_err(|e| e.to_string())?;
    tracing::info!(endpoint = %config.endpoint, "using HTTP transport");
    Ok(SyncEngine::new(db, Box::new(transport), config))
}

fn handle_request(
    request: DaemonRequest,
    engine: &SyncEngine,
    scheduler: &SchedulerHandle,
) -> DaemonResponse {
    match request {
        DaemonRequest::Ping => DaemonResponse::Pong,
        DaemonRequest::Hello { version: _ } => DaemonResponse::Hello {
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        DaemonRequest::Status => {
            let status = engine.status();
            DaemonResponse::Status(obx_ipc::EngineStatus {
                is_online: status.is_online,
                dispatching: status.dispatching,
                last_sync_time: status.last_sync_time,
                sync_interval_secs: status.sync_interval_secs,
            })
        }
        DaemonRequest::Stats => match engine.stats() {
            Ok(stats) => DaemonResponse::Stats(stats),
            Err(e) => DaemonResponse::Error { message: e.to_string() },
        },
        DaemonRequest::Enqueue { owner_id, kind, payload } => {
            match engine.enqueue(&owner_id, &kind, &payload) {
                Ok(id) => {
                    // Nudge the scheduler so the event ships without waiting
                    // for the next tick.
                    scheduler.kick();
                    DaemonResponse::Enqueued { id }
                }
                Err(e) => DaemonResponse::Error { message: e.to_string() },
            }
        }
        DaemonRequest::SyncNow => {
            scheduler.kick();
            DaemonResponse::SyncScheduled
        }
        DaemonRequest::RecentLog { limit } => match engine.recent_log(limit) {
            Ok(entries) => DaemonResponse::Log { entries },
            Err(e) => DaemonResponse::Error { message: e.to_string() },
        },
        DaemonRequest::Shutdown => DaemonResponse::ShuttingDown,
    }
}

fn parse_state_dir(args: &[String]) -> PathBuf {
    for i in 0..args.len() {
        if args[i] == "--state-dir" {
            if let Some(dir) = args.get(i + 1) {
                return PathBuf::from(dir);
            }
        }
    }
    // Default to XDG state directory
    if let Some(dir) = env::state_dir() {
        return dir;
    }
    if let Some(dir) = env::xdg_state_home() {
        return dir.join("obx");
    }
    dirs::home_dir()
        .map(|h| h.join(".local/state/obx"))
        .unwrap_or_else(|| PathBuf::from(".local/state/obx"))
}

fn setup_logging(log_path: &Path) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env(env::names::RUST_LOG)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // Try to open log file, fall back to stderr
    if let Ok(file) = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
    {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(file)
            .with_ansi(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn acquire_lock(lock_path: &Path) -> std::io::Result<fs::File> {
    use fs2::FileExt;

    let file = fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(lock_path)?;
    file.try_lock_exclusive()
        .map_err(|_| std::io::Error::other("another daemon instance is already running"))?;
    Ok(file)
}

fn write_pid_file(pid_path: &Path) -> std::io::Result<()> {
    fs::write(pid_path, format!("{}", std::process::id()))
}

fn cleanup(pid_path: &Path, socket_path: &Path) {
    let _ = fs::remove_file(pid_path);
    let _ = fs::remove_file(socket_path);
}
