// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for the circuit breaker.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use super::breaker::CircuitBreaker;
use super::test_helpers::ManualClock;

fn make_breaker(cooldown_secs: u64) -> (CircuitBreaker, Arc<ManualClock>) {
    let clock = ManualClock::new(1_000_000);
    let breaker = CircuitBreaker::new(
        Duration::from_secs(cooldown_secs),
        Arc::<ManualClock>::clone(&clock),
    );
    (breaker, clock)
}

#[test]
fn starts_online() {
    let (breaker, _clock) = make_breaker(30);
    assert!(breaker.is_online());
}

#[test]
fn trip_goes_offline_immediately() {
    let (breaker, _clock) = make_breaker(30);
    breaker.trip();
    assert!(!breaker.is_online());
}

#[test]
fn cooldown_elapses_back_to_online() {
    let (breaker, clock) = make_breaker(30);
    breaker.trip();

    clock.advance(29_999);
    assert!(!breaker.is_online());

    clock.advance(1);
    assert!(breaker.is_online());
}

#[test]
fn reset_heals_before_cooldown() {
    let (breaker, clock) = make_breaker(30);
    breaker.trip();
    clock.advance(5);
    assert!(!breaker.is_online());

    breaker.reset();
    assert!(breaker.is_online());
}

#[test]
fn retrip_extends_deadline_from_now() {
    let (breaker, clock) = make_breaker(30);
    breaker.trip();

    clock.advance(20_000);
    breaker.trip();

    // 30s from the second trip, not the first
    clock.advance(29_000);
    assert!(!breaker.is_online());
    clock.advance(1_000);
    assert!(breaker.is_online());
}

#[test]
fn reset_when_already_online_is_a_no_op() {
    let (breaker, _clock) = make_breaker(30);
    breaker.reset();
    assert!(breaker.is_online());
}
