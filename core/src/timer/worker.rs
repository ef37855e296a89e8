//! The worker thread's wait loop
//!
//! Idle: block on the wake signal with no timeout.
//! Armed: sleep on the signal until `now + interval`. A timeout fires the
//! callback; an early wake means the owner changed the state, which is
//! re-read before doing anything else.
//! TornDown: leave the loop and drop the callback and payload.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use ptimer_types::TimerMode;
use tracing::{debug, error, trace};

use super::control::{RunState, Shared};

pub(crate) type Callback<A> = Box<dyn FnMut(&mut A) + Send + 'static>;

/// Replacements queued by the owner, picked up at the top of the next cycle.
pub(crate) struct Pending<A> {
    pub(crate) callback: Option<Callback<A>>,
    pub(crate) argument: Option<A>,
}

impl<A> Default for Pending<A> {
    fn default() -> Self {
        Self {
            callback: None,
            argument: None,
        }
    }
}

pub(crate) type PendingSlot<A> = Arc<Mutex<Pending<A>>>;

pub(crate) struct Worker<A> {
    shared: Arc<Shared>,
    pending: PendingSlot<A>,
    callback: Callback<A>,
    argument: A,
}

impl<A> Worker<A> {
    pub(crate) fn new(
        shared: Arc<Shared>,
        pending: PendingSlot<A>,
        callback: Callback<A>,
        argument: A,
    ) -> Self {
        Self {
            shared,
            pending,
            callback,
            argument,
        }
    }

    pub(crate) fn run(mut self) {
        let _guard = UnwindGuard {
            shared: Arc::clone(&self.shared),
        };
        debug!(timer = %self.shared.name(), "worker started");

        loop {
            self.shared.signal.wait();

            loop {
                match self.shared.state() {
                    RunState::TornDown => {
                        debug!(
                            timer = %self.shared.name(),
                            fired = self.shared.fire_count(),
                            "worker exiting"
                        );
                        return;
                    }
                    RunState::Idle => break,
                    RunState::Armed => self.run_cycle(),
                }
            }
        }
    }

    /// One armed cycle: sleep for the interval, then fire if still armed.
    fn run_cycle(&mut self) {
        self.apply_pending();

        let interval = Duration::from_millis(self.shared.interval_ms());
        let woken = match Instant::now().checked_add(interval) {
            Some(deadline) => self.shared.signal.wait_until(deadline),
            // Deadline not representable: only a wake can end this cycle
            None => {
                self.shared.signal.wait();
                true
            }
        };
        if woken || self.shared.state() != RunState::Armed {
            return;
        }

        (self.callback)(&mut self.argument);
        let fired = self.shared.record_fire();
        trace!(timer = %self.shared.name(), fired, "timer fired");

        if self.shared.mode() == TimerMode::SingleShot {
            self.shared.finish_single_shot();
        }
    }

    fn apply_pending(&mut self) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(callback) = pending.callback.take() {
            self.callback = callback;
        }
        if let Some(argument) = pending.argument.take() {
            self.argument = argument;
        }
    }
}

/// Marks the timer torn down if the callback panics and unwinds the worker.
struct UnwindGuard {
    shared: Arc<Shared>,
}

impl Drop for UnwindGuard {
    fn drop(&mut self) {
        if thread::panicking() {
            self.shared.tear_down();
            error!(timer = %self.shared.name(), "timer callback panicked, worker terminated");
        }
    }
}
