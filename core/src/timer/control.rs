//! Shared run state and the cloneable control handle
//!
//! Everything the owner and the worker both touch lives in `Shared`: the run
//! state, the interval, the fire counter and the wake signal. None of it
//! depends on the callback payload type, so a `TimerControl` can be cloned
//! into the payload itself and used by the callback to stop its own timer.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

use ptimer_types::TimerMode;
use tracing::debug;

use super::signal::WakeSignal;

/// Where the worker is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RunState {
    /// Created or stopped. The worker blocks on the wake signal.
    Idle = 0,
    /// Counting down toward the next fire, or firing.
    Armed = 1,
    /// Destroy requested. Absorbing: nothing leaves this state.
    TornDown = 2,
}

impl RunState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => RunState::Idle,
            1 => RunState::Armed,
            _ => RunState::TornDown,
        }
    }
}

pub(crate) struct Shared {
    name: String,
    mode: TimerMode,
    state: AtomicU8,
    interval_ms: AtomicU64,
    fire_count: AtomicU64,
    pub(crate) signal: WakeSignal,
}

impl Shared {
    pub(crate) fn new(name: String, mode: TimerMode, interval_ms: u64) -> Self {
        Self {
            name,
            mode,
            state: AtomicU8::new(RunState::Idle as u8),
            interval_ms: AtomicU64::new(interval_ms),
            fire_count: AtomicU64::new(0),
            signal: WakeSignal::new(),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn mode(&self) -> TimerMode {
        self.mode
    }

    pub(crate) fn state(&self) -> RunState {
        RunState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn interval_ms(&self) -> u64 {
        self.interval_ms.load(Ordering::Acquire)
    }

    fn transition(&self, from: RunState, to: RunState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Idle -> Armed, waking the worker. No-op in any other state.
    pub(crate) fn start(&self) {
        if self.transition(RunState::Idle, RunState::Armed) {
            debug!(timer = %self.name, "timer armed");
            self.signal.post();
        }
    }

    /// Armed -> Idle, interrupting the sleep in progress.
    pub(crate) fn stop(&self) {
        if self.transition(RunState::Armed, RunState::Idle) {
            debug!(timer = %self.name, "timer stopped");
            self.signal.post();
        }
    }

    /// Move to TornDown and wake the worker. Returns `false` if already torn down.
    pub(crate) fn tear_down(&self) -> bool {
        let previous = self.state.swap(RunState::TornDown as u8, Ordering::AcqRel);
        if RunState::from_u8(previous) == RunState::TornDown {
            return false;
        }
        debug!(timer = %self.name, "timer teardown requested");
        self.signal.post();
        true
    }

    /// Return a single-shot timer to idle once its callback has run.
    /// Leaves the state alone if the callback already stopped or destroyed it.
    pub(crate) fn finish_single_shot(&self) {
        self.transition(RunState::Armed, RunState::Idle);
    }

    pub(crate) fn set_interval_ms(&self, interval_ms: u64) {
        self.interval_ms.store(interval_ms, Ordering::Release);
    }

    pub(crate) fn record_fire(&self) -> u64 {
        self.fire_count.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub(crate) fn fire_count(&self) -> u64 {
        self.fire_count.load(Ordering::Acquire)
    }
}

/// Cloneable handle to a timer's state machine.
///
/// Usable from any thread, including from inside the timer's own callback.
/// After the timer is destroyed every operation is a no-op and
/// `is_running` reports `false`.
#[derive(Clone)]
pub struct TimerControl {
    pub(crate) shared: Arc<Shared>,
}

impl TimerControl {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Arm the timer. Ignored unless idle.
    pub fn start(&self) {
        self.shared.start();
    }

    /// Disarm the timer. A callback already running is not interrupted,
    /// but no further cycle begins after it returns.
    pub fn stop(&self) {
        self.shared.stop();
    }

    /// Advisory: the state may change right after this returns.
    pub fn is_running(&self) -> bool {
        self.shared.state() == RunState::Armed
    }

    pub fn is_torn_down(&self) -> bool {
        self.shared.state() == RunState::TornDown
    }

    pub fn state(&self) -> RunState {
        self.shared.state()
    }

    /// Change the interval. Effective after the current cycle.
    pub fn set_timeout(&self, interval_ms: u64) {
        self.shared.set_interval_ms(interval_ms);
    }

    pub fn timeout(&self) -> u64 {
        self.shared.interval_ms()
    }

    pub fn mode(&self) -> TimerMode {
        self.shared.mode()
    }

    pub fn name(&self) -> &str {
        self.shared.name()
    }

    /// Number of callback invocations completed so far.
    pub fn fire_count(&self) -> u64 {
        self.shared.fire_count()
    }
}

impl fmt::Debug for TimerControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerControl")
            .field("name", &self.shared.name())
            .field("mode", &self.shared.mode())
            .field("state", &self.shared.state())
            .field("interval_ms", &self.shared.interval_ms())
            .field("fire_count", &self.shared.fire_count())
            .finish()
    }
}
