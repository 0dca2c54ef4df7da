//! Monotonic-ish nanosecond timestamps.
//!
//! Record timestamps and SSTable run names both need a 64-bit nanosecond
//! counter that never repeats within a process, even when the system clock
//! has coarser resolution than the call rate. `now_nanos` returns the wall
//! clock when it has advanced, and `last + 1` when it has not.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static LAST: AtomicU64 = AtomicU64::new(0);

/// Returns a strictly increasing nanosecond timestamp.
pub fn now_nanos() -> u64 {
    let wall = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);

    let mut prev = LAST.load(Ordering::Relaxed);
    loop {
        let next = wall.max(prev.saturating_add(1));
        match LAST.compare_exchange_weak(prev, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(observed) => prev = observed,
        }
    }
}
