// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Online/offline circuit breaker.
//!
//! A binary signal with a time-based half-open recovery: a connectivity
//! failure flips it offline for a fixed cooldown, after which it reports
//! online again and the next scheduled dispatch attempts a real send. No
//! exponential backoff.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use obx_core::clock::ClockSource;

/// Time-based circuit breaker guarding the dispatch path.
pub struct CircuitBreaker {
    clock: Arc<dyn ClockSource>,
    cooldown_ms: u64,
    /// Epoch millis until which the breaker reports offline. None = online.
    offline_until_ms: Mutex<Option<u64>>,
}

impl CircuitBreaker {
    /// Create a breaker with the given cooldown and clock.
    pub fn new(cooldown: Duration, clock: Arc<dyn ClockSource>) -> Self {
        CircuitBreaker {
            clock,
            cooldown_ms: cooldown.as_millis() as u64,
            offline_until_ms: Mutex::new(None),
        }
    }

    /// Current signal. Flips back online automatically once the cooldown
    /// has elapsed.
    pub fn is_online(&self) -> bool {
        let mut until = self.offline_until_ms.lock();
        match *until {
            None => true,
            Some(deadline) => {
                if self.clock.now_ms() >= deadline {
                    *until = None;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Record a connectivity failure: go offline for one cooldown period.
    ///
    /// Repeated trips while already offline extend the deadline from now,
    /// not from the previous deadline.
    pub fn trip(&self) {
        let deadline = self.clock.now_ms().saturating_add(self.cooldown_ms);
        *self.offline_until_ms.lock() = Some(deadline);
        tracing::warn!(cooldown_ms = self.cooldown_ms, "sync breaker tripped, going offline");
    }

    /// Record a successful delivery: back online immediately.
    pub fn reset(&self) {
        let mut until = self.offline_until_ms.lock();
        if until.is_some() {
            tracing::info!("sync breaker reset, back online");
        }
        *until = None;
    }
}
