//! Counting wake signal
//!
//! A semaphore shared by a timer's owner and its worker. `start` posts to
//! release the worker from its idle wait, `stop` and `destroy` post to cut an
//! armed sleep short. Posts are counted, so none is ever lost.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

#[derive(Debug, Default)]
pub struct WakeSignal {
    count: Mutex<usize>,
    cond: Condvar,
}

impl WakeSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one unit and release at most one waiter.
    pub fn post(&self) {
        let mut count = self.lock();
        *count += 1;
        self.cond.notify_one();
    }

    /// Block until a unit is available, then consume it.
    pub fn wait(&self) {
        let mut count = self.lock();
        while *count == 0 {
            count = self.cond.wait(count).unwrap_or_else(PoisonError::into_inner);
        }
        *count -= 1;
    }

    /// Block until a unit is available or `deadline` passes.
    ///
    /// Returns `true` if a unit was consumed, `false` on timeout.
    pub fn wait_until(&self, deadline: Instant) -> bool {
        let mut count = self.lock();
        while *count == 0 {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            count = self
                .cond
                .wait_timeout(count, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        *count -= 1;
        true
    }

    /// Consume a unit if one is immediately available.
    pub fn try_wait(&self) -> bool {
        let mut count = self.lock();
        if *count == 0 {
            return false;
        }
        *count -= 1;
        true
    }

    /// Current number of unconsumed posts (diagnostic only).
    pub fn count(&self) -> usize {
        *self.lock()
    }

    // The counter is a plain integer, so a poisoned lock still holds a valid value.
    fn lock(&self) -> MutexGuard<'_, usize> {
        self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
