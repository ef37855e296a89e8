//! The owning timer handle and its builder

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use ptimer_types::{PtimerConfig, TimerMode, WaitMode};
use tracing::{debug, error, warn};

use super::control::{RunState, Shared, TimerControl};
use super::error::TimerError;
use super::worker::{Pending, PendingSlot, Worker};

const DEFAULT_WORKER_NAME: &str = "ptimer-worker";

/// Configures the worker thread before a timer is created.
#[derive(Debug, Clone)]
pub struct TimerBuilder {
    mode: TimerMode,
    interval_ms: u64,
    name: Option<String>,
    stack_size: Option<usize>,
}

impl TimerBuilder {
    pub fn new(mode: TimerMode, interval_ms: u64) -> Self {
        Self {
            mode,
            interval_ms,
            name: None,
            stack_size: None,
        }
    }

    /// Builder seeded with the configured defaults for a timer called `name`.
    pub fn from_config(config: &PtimerConfig, name: &str) -> Self {
        Self {
            mode: config.default_mode,
            interval_ms: config.default_interval_ms,
            name: Some(config.worker_name(name)),
            stack_size: config.worker_stack_size,
        }
    }

    pub fn mode(mut self, mode: TimerMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn interval_ms(mut self, interval_ms: u64) -> Self {
        self.interval_ms = interval_ms;
        self
    }

    /// Name for the worker thread, also used in log output.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    /// Spawn the worker and return the idle timer.
    ///
    /// If the worker cannot be spawned nothing is left behind: the callback
    /// and argument are dropped along with the shared state.
    pub fn spawn<A, F>(self, callback: F, argument: A) -> Result<Timer<A>, TimerError>
    where
        A: Send + 'static,
        F: FnMut(&mut A) + Send + 'static,
    {
        let name = self.name.unwrap_or_else(|| DEFAULT_WORKER_NAME.to_string());
        let shared = Arc::new(Shared::new(name.clone(), self.mode, self.interval_ms));
        let pending: PendingSlot<A> = Arc::new(Mutex::new(Pending::default()));
        let worker = Worker::new(
            Arc::clone(&shared),
            Arc::clone(&pending),
            Box::new(callback),
            argument,
        );

        let mut builder = thread::Builder::new().name(name);
        if let Some(bytes) = self.stack_size {
            builder = builder.stack_size(bytes);
        }
        let handle = builder
            .spawn(move || worker.run())
            .map_err(TimerError::from_spawn)?;

        debug!(
            timer = %shared.name(),
            mode = %self.mode,
            interval_ms = self.interval_ms,
            "timer created"
        );

        Ok(Timer {
            control: TimerControl::new(shared),
            pending,
            worker: Some(handle),
        })
    }
}

/// A single-shot or periodic timer with its own worker thread.
///
/// The callback runs on the worker, receiving `&mut A`. Invocations never
/// overlap. Changes to the interval, callback or argument apply from the
/// next wait cycle; a cycle already sleeping keeps its deadline.
///
/// Dropping a `Timer` is the same as `destroy(WaitMode::NoWait)`.
pub struct Timer<A: Send + 'static> {
    control: TimerControl,
    pending: PendingSlot<A>,
    worker: Option<JoinHandle<()>>,
}

impl<A: Send + 'static> Timer<A> {
    /// Create an idle timer. Call [`Timer::start`] to arm it.
    pub fn new<F>(
        mode: TimerMode,
        interval_ms: u64,
        callback: F,
        argument: A,
    ) -> Result<Self, TimerError>
    where
        F: FnMut(&mut A) + Send + 'static,
    {
        TimerBuilder::new(mode, interval_ms).spawn(callback, argument)
    }

    pub fn builder(mode: TimerMode, interval_ms: u64) -> TimerBuilder {
        TimerBuilder::new(mode, interval_ms)
    }

    /// Arm the timer. Ignored while already armed.
    ///
    /// This is also how a single-shot timer is re-fired after it went idle.
    pub fn start(&self) {
        self.control.start();
    }

    /// Disarm the timer and cancel the pending fire, if any.
    ///
    /// A callback that is already executing runs to completion.
    pub fn stop(&self) {
        self.control.stop();
    }

    /// Advisory only. Count fires in the callback when a hard guarantee is needed.
    pub fn is_running(&self) -> bool {
        self.control.is_running()
    }

    pub fn state(&self) -> RunState {
        self.control.state()
    }

    pub fn mode(&self) -> TimerMode {
        self.control.mode()
    }

    pub fn name(&self) -> &str {
        self.control.name()
    }

    /// Effective after the current cycle.
    pub fn set_timeout(&self, interval_ms: u64) {
        self.control.set_timeout(interval_ms);
    }

    pub fn timeout(&self) -> u64 {
        self.control.timeout()
    }

    /// Replace the callback. Effective after the current cycle.
    pub fn set_callback<F>(&self, callback: F)
    where
        F: FnMut(&mut A) + Send + 'static,
    {
        self.pending().callback = Some(Box::new(callback));
    }

    /// Replace the callback argument. Effective after the current cycle.
    ///
    /// The previous argument is dropped on the worker thread.
    pub fn set_callback_argument(&self, argument: A) {
        self.pending().argument = Some(argument);
    }

    pub fn fire_count(&self) -> u64 {
        self.control.fire_count()
    }

    /// A cloneable handle for stopping or restarting this timer from
    /// elsewhere, typically from inside its own callback.
    pub fn control(&self) -> TimerControl {
        self.control.clone()
    }

    /// Tear the timer down.
    ///
    /// With [`WaitMode::Wait`] this blocks until the worker has exited, so
    /// no callback can run after it returns. A callback executing at the
    /// time of the call finishes first. With [`WaitMode::NoWait`] the worker
    /// finishes teardown on its own.
    ///
    /// Waiting from inside the timer's own callback would join the current
    /// thread; that case is logged and treated as `NoWait`.
    pub fn destroy(mut self, wait_mode: WaitMode) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        self.control.shared.tear_down();

        if wait_mode == WaitMode::NoWait {
            return;
        }
        if worker.thread().id() == thread::current().id() {
            warn!(
                timer = %self.control.name(),
                "destroy(Wait) called from the timer's own callback, not waiting"
            );
            return;
        }
        if worker.join().is_err() {
            error!(timer = %self.control.name(), "timer worker exited by panic");
        }
        debug!(timer = %self.control.name(), "timer destroyed");
    }

    fn pending(&self) -> std::sync::MutexGuard<'_, Pending<A>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<A: Send + 'static> Drop for Timer<A> {
    fn drop(&mut self) {
        if self.worker.take().is_some() {
            self.control.shared.tear_down();
        }
    }
}

impl<A: Send + 'static> fmt::Debug for Timer<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("control", &self.control)
            .field("worker_alive", &self.worker.is_some())
            .finish()
    }
}
