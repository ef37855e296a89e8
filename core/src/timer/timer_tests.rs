//! Tests for the timer state machine
//!
//! Timing assertions use generous margins so they hold on loaded CI machines.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use ptimer_types::{TimerMode, WaitMode};

use super::{RunState, Timer, TimerBuilder, TimerControl};
use crate::util::sleep;

/// Timer whose callback increments a shared counter
fn counting_timer(mode: TimerMode, interval_ms: u64) -> (Timer<Arc<AtomicU64>>, Arc<AtomicU64>) {
    let counter = Arc::new(AtomicU64::new(0));
    let timer = Timer::new(
        mode,
        interval_ms,
        |count: &mut Arc<AtomicU64>| {
            count.fetch_add(1, Ordering::SeqCst);
        },
        Arc::clone(&counter),
    )
    .expect("timer creation");
    (timer, counter)
}

#[test]
fn test_new_timer_is_idle_and_silent() {
    let (timer, counter) = counting_timer(TimerMode::Periodic, 20);
    assert_eq!(timer.state(), RunState::Idle);
    assert!(!timer.is_running());

    sleep(100);
    assert_eq!(counter.load(Ordering::SeqCst), 0);
    timer.destroy(WaitMode::Wait);
}

#[test]
fn test_periodic_scenario() {
    let (timer, counter) = counting_timer(TimerMode::Periodic, 100);
    timer.start();
    assert!(timer.is_running());

    sleep(350);
    timer.stop();
    let fired = counter.load(Ordering::SeqCst);
    assert!((2..=4).contains(&fired), "expected ~3 fires, got {fired}");
    assert!(!timer.is_running());

    timer.destroy(WaitMode::Wait);
}

#[test]
fn test_periodic_fire_count_within_tolerance() {
    let (timer, counter) = counting_timer(TimerMode::Periodic, 40);
    timer.start();
    sleep(5 * 40 + 20);
    timer.destroy(WaitMode::Wait);

    let fired = counter.load(Ordering::SeqCst);
    assert!((4..=6).contains(&fired), "expected 4..=6 fires, got {fired}");
}

#[test]
fn test_single_shot_scenario() {
    let flag = Arc::new(AtomicBool::new(false));
    let invocations = Arc::new(AtomicU64::new(0));
    let timer = Timer::new(
        TimerMode::SingleShot,
        50,
        |(flag, invocations): &mut (Arc<AtomicBool>, Arc<AtomicU64>)| {
            flag.store(true, Ordering::SeqCst);
            invocations.fetch_add(1, Ordering::SeqCst);
        },
        (Arc::clone(&flag), Arc::clone(&invocations)),
    )
    .expect("timer creation");

    timer.start();
    sleep(150);
    assert!(flag.load(Ordering::SeqCst));
    assert_eq!(invocations.load(Ordering::SeqCst), 1);

    sleep(200);
    assert_eq!(invocations.load(Ordering::SeqCst), 1);
    assert!(!timer.is_running());
    assert_eq!(timer.fire_count(), 1);

    timer.destroy(WaitMode::Wait);
}

#[test]
fn test_single_shot_restart_fires_once_more() {
    let (timer, counter) = counting_timer(TimerMode::SingleShot, 30);

    timer.start();
    sleep(150);
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    timer.start();
    sleep(150);
    assert_eq!(counter.load(Ordering::SeqCst), 2);

    timer.destroy(WaitMode::Wait);
}

#[test]
fn test_start_while_armed_is_ignored() {
    let (timer, counter) = counting_timer(TimerMode::SingleShot, 60);
    timer.start();
    sleep(10);
    timer.start();
    timer.start();
    sleep(200);

    assert_eq!(counter.load(Ordering::SeqCst), 1);
    timer.destroy(WaitMode::Wait);
}

#[test]
fn test_stop_before_deadline_cancels_fire() {
    let (timer, counter) = counting_timer(TimerMode::Periodic, 200);
    timer.start();
    sleep(50);
    timer.stop();

    sleep(300);
    assert_eq!(counter.load(Ordering::SeqCst), 0);
    timer.destroy(WaitMode::Wait);
}

#[test]
fn test_stop_is_idempotent() {
    let (timer, counter) = counting_timer(TimerMode::Periodic, 30);
    timer.stop();
    timer.stop();
    assert_eq!(timer.state(), RunState::Idle);

    timer.start();
    sleep(100);
    timer.stop();
    timer.stop();
    let fired = counter.load(Ordering::SeqCst);

    sleep(100);
    assert_eq!(counter.load(Ordering::SeqCst), fired);
    timer.destroy(WaitMode::Wait);
}

#[test]
fn test_restart_after_stop() {
    let (timer, counter) = counting_timer(TimerMode::Periodic, 30);
    timer.start();
    sleep(100);
    timer.stop();
    let first_run = counter.load(Ordering::SeqCst);
    assert!(first_run >= 1);

    timer.start();
    sleep(100);
    timer.stop();
    assert!(counter.load(Ordering::SeqCst) > first_run);

    timer.destroy(WaitMode::Wait);
}

/// Payload for a callback that stops its own timer
struct SelfStopping {
    control: Option<TimerControl>,
    fired: Arc<AtomicU64>,
    stop_after: u64,
}

#[test]
fn test_self_stop_from_callback() {
    let fired = Arc::new(AtomicU64::new(0));
    let timer = Timer::new(
        TimerMode::Periodic,
        20,
        |state: &mut SelfStopping| {
            let n = state.fired.fetch_add(1, Ordering::SeqCst) + 1;
            if n == state.stop_after {
                if let Some(control) = &state.control {
                    control.stop();
                }
            }
        },
        SelfStopping {
            control: None,
            fired: Arc::clone(&fired),
            stop_after: 3,
        },
    )
    .expect("timer creation");

    // The control handle only exists once the timer does
    timer.set_callback_argument(SelfStopping {
        control: Some(timer.control()),
        fired: Arc::clone(&fired),
        stop_after: 3,
    });
    timer.start();

    sleep(400);
    assert_eq!(fired.load(Ordering::SeqCst), 3);
    assert!(!timer.is_running());

    timer.destroy(WaitMode::Wait);
}

#[test]
fn test_stop_during_callback_prevents_next_cycle() {
    let entered = Arc::new(AtomicBool::new(false));
    let fired = Arc::new(AtomicU64::new(0));
    let timer = Timer::new(
        TimerMode::Periodic,
        20,
        |(entered, fired): &mut (Arc<AtomicBool>, Arc<AtomicU64>)| {
            entered.store(true, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(100));
            fired.fetch_add(1, Ordering::SeqCst);
        },
        (Arc::clone(&entered), Arc::clone(&fired)),
    )
    .expect("timer creation");

    timer.start();
    while !entered.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(1));
    }
    timer.stop();

    sleep(300);
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    timer.destroy(WaitMode::Wait);
}

#[test]
fn test_destroy_wait_blocks_until_callback_returns() {
    let entered = Arc::new(AtomicBool::new(false));
    let finished = Arc::new(AtomicBool::new(false));
    let timer = Timer::new(
        TimerMode::Periodic,
        10,
        |(entered, finished): &mut (Arc<AtomicBool>, Arc<AtomicBool>)| {
            entered.store(true, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(150));
            finished.store(true, Ordering::SeqCst);
        },
        (Arc::clone(&entered), Arc::clone(&finished)),
    )
    .expect("timer creation");

    timer.start();
    while !entered.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(1));
    }
    timer.destroy(WaitMode::Wait);
    assert!(finished.load(Ordering::SeqCst));
}

#[test]
fn test_no_fire_after_destroy_wait() {
    let (timer, counter) = counting_timer(TimerMode::Periodic, 10);
    let control = timer.control();
    timer.start();
    sleep(60);

    timer.destroy(WaitMode::Wait);
    let fired = counter.load(Ordering::SeqCst);
    assert!(control.is_torn_down());

    sleep(100);
    assert_eq!(counter.load(Ordering::SeqCst), fired);
    // Worker dropped its clone of the payload on exit
    assert_eq!(Arc::strong_count(&counter), 1);
}

#[test]
fn test_destroy_idle_timer_returns_promptly() {
    let (timer, _counter) = counting_timer(TimerMode::Periodic, 60_000);
    let start = std::time::Instant::now();
    timer.destroy(WaitMode::Wait);
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[test]
fn test_destroy_during_long_sleep_returns_promptly() {
    let (timer, counter) = counting_timer(TimerMode::Periodic, 60_000);
    timer.start();
    sleep(20);

    let start = std::time::Instant::now();
    timer.destroy(WaitMode::Wait);
    assert!(start.elapsed() < Duration::from_secs(2));
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

#[test]
fn test_destroy_no_wait_tears_down_eventually() {
    let (timer, counter) = counting_timer(TimerMode::Periodic, 10);
    let control = timer.control();
    timer.start();
    sleep(50);

    timer.destroy(WaitMode::NoWait);
    assert!(control.is_torn_down());

    // Worker releases its payload clone once it has exited
    let mut waited = 0;
    while Arc::strong_count(&counter) > 1 && waited < 2000 {
        sleep(10);
        waited += 10;
    }
    assert_eq!(Arc::strong_count(&counter), 1);
}

#[test]
fn test_drop_tears_down_worker() {
    let (timer, counter) = counting_timer(TimerMode::Periodic, 10);
    let control = timer.control();
    timer.start();
    drop(timer);

    assert!(control.is_torn_down());
    let mut waited = 0;
    while Arc::strong_count(&counter) > 1 && waited < 2000 {
        sleep(10);
        waited += 10;
    }
    assert_eq!(Arc::strong_count(&counter), 1);
}

#[test]
fn test_control_is_inert_after_destroy() {
    let (timer, counter) = counting_timer(TimerMode::Periodic, 10);
    let control = timer.control();
    timer.destroy(WaitMode::Wait);

    control.start();
    control.stop();
    control.start();
    assert_eq!(control.state(), RunState::TornDown);
    assert!(!control.is_running());

    sleep(50);
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

#[test]
fn test_set_timeout_applies_to_next_cycle() {
    let (timer, counter) = counting_timer(TimerMode::Periodic, 300);
    timer.start();
    sleep(50);

    // In-flight cycle keeps its 300ms deadline
    timer.set_timeout(20);
    assert_eq!(timer.timeout(), 20);
    sleep(150);
    assert_eq!(counter.load(Ordering::SeqCst), 0);

    // After the first fire at ~300ms the short interval takes over
    sleep(400);
    timer.stop();
    assert!(counter.load(Ordering::SeqCst) >= 5);

    timer.destroy(WaitMode::Wait);
}

#[test]
fn test_set_callback_applies_to_next_cycle() {
    let (timer, counter) = counting_timer(TimerMode::SingleShot, 30);
    timer.start();
    sleep(120);
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    timer.set_callback(|count: &mut Arc<AtomicU64>| {
        count.fetch_add(100, Ordering::SeqCst);
    });
    timer.start();
    sleep(120);
    assert_eq!(counter.load(Ordering::SeqCst), 101);

    timer.destroy(WaitMode::Wait);
}

#[test]
fn test_set_callback_argument_drops_previous_payload() {
    let (timer, first) = counting_timer(TimerMode::SingleShot, 20);
    let second = Arc::new(AtomicU64::new(0));
    timer.set_callback_argument(Arc::clone(&second));

    timer.start();
    sleep(120);
    assert_eq!(first.load(Ordering::SeqCst), 0);
    assert_eq!(second.load(Ordering::SeqCst), 1);
    assert_eq!(Arc::strong_count(&first), 1);

    timer.destroy(WaitMode::Wait);
}

#[test]
fn test_concurrent_stop_and_destroy() {
    for _ in 0..20 {
        let (timer, counter) = counting_timer(TimerMode::Periodic, 1);
        timer.start();
        let controls: Vec<TimerControl> = (0..4).map(|_| timer.control()).collect();

        let stoppers: Vec<_> = controls
            .into_iter()
            .map(|control| {
                thread::spawn(move || {
                    for _ in 0..50 {
                        control.stop();
                        control.start();
                    }
                    control.stop();
                })
            })
            .collect();

        sleep(5);
        timer.destroy(WaitMode::Wait);
        for stopper in stoppers {
            stopper.join().expect("stopper thread panicked");
        }

        let fired = counter.load(Ordering::SeqCst);
        sleep(20);
        assert_eq!(counter.load(Ordering::SeqCst), fired);
    }
}

#[test]
fn test_callbacks_never_overlap() {
    let active = Arc::new(AtomicU64::new(0));
    let overlapped = Arc::new(AtomicBool::new(false));
    let timer = Timer::new(
        TimerMode::Periodic,
        1,
        |(active, overlapped): &mut (Arc<AtomicU64>, Arc<AtomicBool>)| {
            if active.fetch_add(1, Ordering::SeqCst) != 0 {
                overlapped.store(true, Ordering::SeqCst);
            }
            thread::sleep(Duration::from_millis(3));
            active.fetch_sub(1, Ordering::SeqCst);
        },
        (Arc::clone(&active), Arc::clone(&overlapped)),
    )
    .expect("timer creation");

    timer.start();
    sleep(100);
    timer.destroy(WaitMode::Wait);
    assert!(!overlapped.load(Ordering::SeqCst));
}

#[test]
fn test_destroy_wait_from_own_callback_does_not_deadlock() {
    let done = Arc::new(AtomicBool::new(false));
    let slot: Arc<std::sync::Mutex<Option<Timer<()>>>> = Arc::new(std::sync::Mutex::new(None));

    let timer = {
        let slot = Arc::clone(&slot);
        let done = Arc::clone(&done);
        Timer::new(
            TimerMode::SingleShot,
            20,
            move |_: &mut ()| {
                let taken = slot.lock().expect("slot lock").take();
                if let Some(timer) = taken {
                    timer.destroy(WaitMode::Wait);
                }
                done.store(true, Ordering::SeqCst);
            },
            (),
        )
        .expect("timer creation")
    };
    let control = timer.control();
    timer.start();
    *slot.lock().expect("slot lock") = Some(timer);

    let mut waited = 0;
    while !done.load(Ordering::SeqCst) && waited < 2000 {
        sleep(10);
        waited += 10;
    }
    assert!(done.load(Ordering::SeqCst));
    assert!(control.is_torn_down());
}

#[test]
fn test_callback_panic_terminates_worker() {
    let timer = Timer::new(
        TimerMode::Periodic,
        10,
        |_: &mut ()| {
            panic!("callback failure");
        },
        (),
    )
    .expect("timer creation");
    let control = timer.control();
    timer.start();

    let mut waited = 0;
    while !control.is_torn_down() && waited < 2000 {
        sleep(10);
        waited += 10;
    }
    assert!(control.is_torn_down());
    assert!(!control.is_running());
    timer.destroy(WaitMode::Wait);
}

#[test]
fn test_builder_names_worker_thread() {
    let seen = Arc::new(std::sync::Mutex::new(None::<String>));
    let timer = TimerBuilder::new(TimerMode::SingleShot, 10)
        .name("blink")
        .stack_size(128 * 1024)
        .spawn(
            |seen: &mut Arc<std::sync::Mutex<Option<String>>>| {
                *seen.lock().expect("lock") = thread::current().name().map(str::to_string);
            },
            Arc::clone(&seen),
        )
        .expect("timer creation");

    assert_eq!(timer.name(), "blink");
    timer.start();
    sleep(100);
    assert_eq!(seen.lock().expect("lock").as_deref(), Some("blink"));
    timer.destroy(WaitMode::Wait);
}

#[test]
fn test_builder_from_config() {
    let config = ptimer_types::PtimerConfig {
        default_mode: TimerMode::SingleShot,
        default_interval_ms: 15,
        ..Default::default()
    };
    let (timer, counter) = {
        let counter = Arc::new(AtomicU64::new(0));
        let timer = TimerBuilder::from_config(&config, "cfg")
            .spawn(
                |count: &mut Arc<AtomicU64>| {
                    count.fetch_add(1, Ordering::SeqCst);
                },
                Arc::clone(&counter),
            )
            .expect("timer creation");
        (timer, counter)
    };

    assert_eq!(timer.mode(), TimerMode::SingleShot);
    assert_eq!(timer.timeout(), 15);
    assert_eq!(timer.name(), "ptimer-cfg");

    timer.start();
    sleep(100);
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    timer.destroy(WaitMode::Wait);
}
