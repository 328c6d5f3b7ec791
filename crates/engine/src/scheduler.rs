// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatch scheduler.
//!
//! A single tokio task drives the engine: a fixed-cadence tick plus an
//! on-demand kick used by the enqueue path and explicit "sync now"
//! requests. Every trigger funnels through the engine's dispatch flag, so
//! overlapping triggers collapse instead of queueing.

use std::sync::Arc;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::engine::SyncEngine;

/// Spawns and owns the scheduler task.
pub struct Scheduler;

/// Handle to a running scheduler task.
pub struct SchedulerHandle {
    kick: Arc<Notify>,
    shutdown: Arc<Notify>,
    task: JoinHandle<()>,
}

impl Scheduler {
    /// Spawn the scheduler loop on the current tokio runtime.
    pub fn spawn(engine: Arc<SyncEngine>) -> SchedulerHandle {
        let kick = Arc::new(Notify::new());
        let shutdown = Arc::new(Notify::new());
        let task = tokio::spawn(run_loop(engine, Arc::clone(&kick), Arc::clone(&shutdown)));
        SchedulerHandle { kick, shutdown, task }
    }
}

impl SchedulerHandle {
    /// Request an immediate dispatch attempt.
    ///
    /// Non-blocking and infallible: if a dispatch is already running the
    /// request collapses into it. Used by the enqueue path, which only
    /// guarantees durability, not immediacy.
    pub fn kick(&self) {
        self.kick.notify_one();
    }

    /// Stop the scheduler and wait for the loop to exit.
    ///
    /// An in-flight dispatch runs to completion first; there is no
    /// mid-batch cancellation.
    pub async fn shutdown(self) {
        self.shutdown.notify_one();
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "scheduler task did not shut down cleanly");
        }
    }
}

async fn run_loop(engine: Arc<SyncEngine>, kick: Arc<Notify>, shutdown: Arc<Notify>) {
    let mut interval = tokio::time::interval(engine.config().sync_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tracing::info!(
        interval_secs = engine.config().sync_interval_secs,
        "sync scheduler started"
    );

    loop {
        let explicit = tokio::select! {
            _ = shutdown.notified() => break,
            _ = kick.notified() => true,
            _ = interval.tick() => false,
        };

        // Timer ticks respect the cadence gate; kicks are immediate.
        if !explicit && !engine.interval_elapsed() {
            continue;
        }

        let result = if explicit {
            engine.sync_now().await
        } else {
            engine.dispatch_once().await
        };

        // Per-attempt errors (store I/O) are logged and retried on the next
        // trigger; nothing is allowed to take the loop down.
        if let Err(e) = result {
            tracing::error!(error = %e, "dispatch attempt failed");
        }
    }

    tracing::info!("sync scheduler stopped");
}
