use ptimer_core::{PtimerConfig, PtimerConfigExt, Timer, TimerControl};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, RwLock};

/// Callback payload for timers created from the REPL.
pub struct TimerPayload {
    pub name: String,
    pub fired: Arc<AtomicU64>,
    /// Stop the timer from inside its callback after this many fires.
    pub stop_after: Option<u64>,
    pub control: Option<TimerControl>,
    /// Suppress the per-fire line (used by tests).
    pub quiet: bool,
}

impl TimerPayload {
    pub fn new(name: &str, stop_after: Option<u64>) -> Self {
        Self {
            name: name.to_string(),
            fired: Arc::new(AtomicU64::new(0)),
            stop_after,
            control: None,
            quiet: false,
        }
    }

    /// Callback shared by every REPL timer.
    pub fn on_fire(&mut self) {
        let n = self.fired.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.quiet {
            println!("\n[{}] fired ({})", self.name, n);
        }
        if self.stop_after == Some(n) {
            if let Some(control) = &self.control {
                control.stop();
            }
        }
    }
}

pub type CliTimer = Timer<TimerPayload>;

/// Holds all shared state for the CLI application.
#[derive(Clone)]
pub struct CliContext {
    pub config: Arc<RwLock<PtimerConfig>>,
    /// Live timers keyed by the name given at `create`.
    pub timers: Arc<Mutex<HashMap<String, CliTimer>>>,
}

impl CliContext {
    pub fn new() -> Self {
        Self::with_config(PtimerConfig::load())
    }

    pub fn with_config(config: PtimerConfig) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            timers: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl Default for CliContext {
    fn default() -> Self {
        Self::new()
    }
}
