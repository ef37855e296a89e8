//! Timer primitive
//!
//! This module provides:
//! - **Timer**: owning handle for a single-shot or periodic timer
//! - **TimerControl**: cloneable handle for start/stop from any thread,
//!   including the timer's own callback
//! - **WakeSignal**: the counting semaphore the worker sleeps on
//!
//! # Lifecycle
//!
//! 1. `Timer::new` spawns the worker, which waits idle on the wake signal
//! 2. `start` arms the timer; the worker sleeps `interval_ms` then fires
//! 3. `stop` (from the owner or the callback) returns it to idle
//! 4. `destroy` tears it down; the worker exits and drops the callback

mod control;
mod error;
mod handle;
mod signal;
mod worker;

#[cfg(test)]
mod timer_tests;

pub use control::{RunState, TimerControl};
pub use error::TimerError;
pub use handle::{Timer, TimerBuilder};
pub use signal::WakeSignal;
