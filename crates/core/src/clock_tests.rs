// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;

#[test]
fn system_clock_is_past_2020() {
    // 2020-01-01 in epoch millis
    assert!(SystemClock.now_ms() > 1_577_836_800_000);
}

#[test]
fn system_clock_does_not_go_backwards_across_calls() {
    let a = SystemClock.now_ms();
    let b = SystemClock.now_ms();
    assert!(b >= a);
}

fn read_clock<C: ClockSource>(clock: C) -> u64 {
    clock.now_ms()
}

#[test]
fn clock_source_works_through_reference() {
    let clock = SystemClock;
    assert!(read_clock(&clock) > 0);
}
