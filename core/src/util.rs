//! Small helpers for call sites that drive timers

use std::thread;
use std::time::Duration;

/// Convert whole seconds to milliseconds, for interval arguments.
///
/// ```
/// assert_eq!(ptimer_core::seconds(2), 2000);
/// ```
pub const fn seconds(secs: u64) -> u64 {
    secs * 1000
}

/// Block the calling thread for `interval_ms` milliseconds.
pub fn sleep(interval_ms: u64) {
    thread::sleep(Duration::from_millis(interval_ms));
}
