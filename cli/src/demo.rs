//! Replays the two classic timer scenarios: a single-shot greeting and a
//! periodic timer that says goodbye and stops itself on its third fire.

use ptimer_core::{Timer, TimerControl, TimerError, TimerMode, WaitMode, sleep};
use tracing::debug;

const POLL_MS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemoReport {
    pub single_fired: u64,
    pub periodic_fired: u64,
}

struct Greeting {
    message: &'static str,
    verbose: bool,
}

struct Countdown {
    counter: u32,
    control: Option<TimerControl>,
    verbose: bool,
}

fn say(verbose: bool, line: &str) {
    if verbose {
        println!("{line}");
    }
}

fn greet(greeting: &mut Greeting) {
    say(greeting.verbose, greeting.message);
}

fn count_down(state: &mut Countdown) {
    state.counter += 1;
    if state.counter == 3 {
        say(state.verbose, "Goodbye by periodic timer");
        // The interval or callback could be swapped here too
        if let Some(control) = &state.control {
            control.stop();
        }
    } else {
        say(state.verbose, "Hello by periodic timer");
    }
}

/// Run both scenarios on the calling thread. Blocks until both timers are done.
pub fn run(interval_ms: u64, verbose: bool) -> Result<DemoReport, TimerError> {
    let single = Timer::new(
        TimerMode::SingleShot,
        interval_ms.saturating_mul(2),
        greet,
        Greeting {
            message: "Hello from single timer",
            verbose,
        },
    )?;
    single.start();
    while single.fire_count() == 0 {
        sleep(POLL_MS);
    }
    let single_fired = single.fire_count();
    single.destroy(WaitMode::Wait);
    debug!(single_fired, "single-shot demo finished");

    let periodic = Timer::new(
        TimerMode::Periodic,
        interval_ms,
        count_down,
        Countdown {
            counter: 0,
            control: None,
            verbose,
        },
    )?;
    // Pass the timer to its own callback so it can stop itself
    periodic.set_callback_argument(Countdown {
        counter: 0,
        control: Some(periodic.control()),
        verbose,
    });
    periodic.start();
    while periodic.is_running() {
        sleep(POLL_MS);
    }
    say(verbose, "Periodic timer finished");
    let periodic_fired = periodic.fire_count();
    periodic.destroy(WaitMode::Wait);

    Ok(DemoReport {
        single_fired,
        periodic_fired,
    })
}
