//! Tests for utility functions

use std::time::Duration;

use prometheus_admission::util::{init_tracing, now_ms, Clock, ManualClock, SystemClock};

#[test]
fn test_now_ms_is_after_epoch() {
    assert!(now_ms() > 1_600_000_000_000);
}

#[test]
fn test_manual_clock_clones_share_time() {
    let clock = ManualClock::new();
    let other = clock.clone();
    let start = clock.now();
    other.advance(Duration::from_millis(250));
    assert_eq!(clock.now() - start, Duration::from_millis(250));
}

#[test]
fn test_system_clock_monotonic() {
    let a = SystemClock.now();
    let b = SystemClock.now();
    assert!(b >= a);
}

#[test]
fn test_init_tracing_twice() {
    init_tracing();
    init_tracing();
}
