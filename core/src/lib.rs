pub mod context;
pub mod timer;
pub mod util;

// Re-exports for convenience
pub use context::{ConfigError, PtimerConfig, PtimerConfigExt};
pub use ptimer_types::{TimerMode, WaitMode};
pub use timer::{RunState, Timer, TimerBuilder, TimerControl, TimerError, WakeSignal};
pub use util::{seconds, sleep};
