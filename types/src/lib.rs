//! Shared configuration types for ptimer
//!
//! This crate contains the serializable types shared between the timer
//! engine (ptimer-core) and the command line front end (ptimer-cli).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ─────────────────────────────────────────────────────────────────────────────
// Timer Modes
// ─────────────────────────────────────────────────────────────────────────────

/// Whether a timer fires once per `start` or keeps firing until stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerMode {
    /// Fires once, then returns to idle. Must be started again to re-fire.
    SingleShot,
    /// Fires at every interval until stopped or destroyed.
    #[default]
    Periodic,
}

impl TimerMode {
    pub fn label(&self) -> &'static str {
        match self {
            TimerMode::SingleShot => "single-shot",
            TimerMode::Periodic => "periodic",
        }
    }
}

impl fmt::Display for TimerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TimerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "single" | "single-shot" | "single_shot" | "once" => Ok(TimerMode::SingleShot),
            "periodic" | "repeat" => Ok(TimerMode::Periodic),
            other => Err(format!("unknown timer mode '{other}'")),
        }
    }
}

/// How `destroy` treats the worker thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitMode {
    /// Block until the worker has exited. No callback fires after return.
    #[default]
    Wait,
    /// Return immediately; the worker tears down on its own.
    NoWait,
}

// ─────────────────────────────────────────────────────────────────────────────
// Persisted Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Defaults applied when timers are created without explicit settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PtimerConfig {
    #[serde(default)]
    pub default_mode: TimerMode,
    #[serde(default = "default_interval_ms")]
    pub default_interval_ms: u64,
    #[serde(default)]
    pub destroy_wait_mode: WaitMode,

    /// Stack size for worker threads in bytes. `None` uses the platform default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_stack_size: Option<usize>,

    /// Worker threads are named `<prefix>-<timer name>`.
    #[serde(default = "default_name_prefix")]
    pub worker_name_prefix: String,
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_name_prefix() -> String {
    "ptimer".to_string()
}

impl Default for PtimerConfig {
    fn default() -> Self {
        Self {
            default_mode: TimerMode::default(),
            default_interval_ms: default_interval_ms(),
            destroy_wait_mode: WaitMode::default(),
            worker_stack_size: None,
            worker_name_prefix: default_name_prefix(),
        }
    }
}

impl PtimerConfig {
    /// Thread name for a worker serving the timer called `name`.
    pub fn worker_name(&self, name: &str) -> String {
        if self.worker_name_prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}-{}", self.worker_name_prefix, name)
        }
    }
}
