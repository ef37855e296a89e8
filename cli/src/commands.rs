use crate::context::{CliContext, TimerPayload};
use crate::demo;
use ptimer_core::{TimerBuilder, TimerMode, WaitMode};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

pub async fn create_timer(
    ctx: &CliContext,
    name: &str,
    mode: Option<TimerMode>,
    interval_ms: Option<u64>,
    stop_after: Option<u64>,
    quiet: bool,
) -> Result<(), String> {
    let mut timers = ctx.timers.lock().await;
    if timers.contains_key(name) {
        return Err(format!("timer '{name}' already exists\n"));
    }

    let builder = {
        let config = ctx.config.read().await;
        let mut builder = TimerBuilder::from_config(&config, name);
        if let Some(mode) = mode {
            builder = builder.mode(mode);
        }
        if let Some(interval_ms) = interval_ms {
            builder = builder.interval_ms(interval_ms);
        }
        builder
    };

    let mut payload = TimerPayload::new(name, stop_after);
    payload.quiet = quiet;
    let fired = Arc::clone(&payload.fired);

    let timer = builder
        .spawn(|payload: &mut TimerPayload| payload.on_fire(), payload)
        .map_err(|e| format!("cannot create timer '{name}': {e}\n"))?;

    // The control handle only exists once the timer does
    timer.set_callback_argument(TimerPayload {
        name: name.to_string(),
        fired,
        stop_after,
        control: Some(timer.control()),
        quiet,
    });

    println!(
        "created {} timer '{}' ({}ms)",
        timer.mode(),
        name,
        timer.timeout()
    );
    timers.insert(name.to_string(), timer);
    Ok(())
}

pub async fn start_timer(ctx: &CliContext, name: &str) -> Result<(), String> {
    let timers = ctx.timers.lock().await;
    let timer = timers.get(name).ok_or_else(|| unknown(name))?;
    timer.start();
    Ok(())
}

pub async fn stop_timer(ctx: &CliContext, name: &str) -> Result<(), String> {
    let timers = ctx.timers.lock().await;
    let timer = timers.get(name).ok_or_else(|| unknown(name))?;
    timer.stop();
    Ok(())
}

pub async fn set_timeout(ctx: &CliContext, name: &str, interval_ms: u64) -> Result<(), String> {
    let timers = ctx.timers.lock().await;
    let timer = timers.get(name).ok_or_else(|| unknown(name))?;
    timer.set_timeout(interval_ms);
    println!("'{name}' interval set to {interval_ms}ms (from next cycle)");
    Ok(())
}

pub async fn show_status(ctx: &CliContext, name: Option<&str>) -> Result<(), String> {
    let timers = ctx.timers.lock().await;
    if let Some(name) = name {
        if !timers.contains_key(name) {
            return Err(unknown(name));
        }
    }
    if timers.is_empty() {
        println!("No timers");
        return Ok(());
    }

    println!(
        "{:<20} {:<12} {:<8} {:>10} {:>8}",
        "Name", "Mode", "Running", "Interval", "Fired"
    );
    println!("{}", "-".repeat(62));

    let mut names: Vec<_> = timers.keys().filter(|n| name.is_none_or(|x| x == n.as_str())).collect();
    names.sort();
    for n in names {
        let timer = &timers[n];
        println!(
            "{:<20} {:<12} {:<8} {:>8}ms {:>8}",
            n,
            timer.mode().label(),
            if timer.is_running() { "yes" } else { "no" },
            timer.timeout(),
            timer.fire_count()
        );
    }
    Ok(())
}

pub async fn destroy_timer(ctx: &CliContext, name: &str, no_wait: bool) -> Result<(), String> {
    let timer = ctx
        .timers
        .lock()
        .await
        .remove(name)
        .ok_or_else(|| unknown(name))?;

    let wait_mode = if no_wait {
        WaitMode::NoWait
    } else {
        ctx.config.read().await.destroy_wait_mode
    };

    // Joining the worker blocks
    tokio::task::spawn_blocking(move || timer.destroy(wait_mode))
        .await
        .map_err(|e| e.to_string())?;
    println!("destroyed '{name}'");
    Ok(())
}

pub async fn sleep(interval_ms: u64) {
    tokio::time::sleep(Duration::from_millis(interval_ms)).await;
}

pub async fn run_demo(interval_ms: u64) -> Result<(), String> {
    let report = tokio::task::spawn_blocking(move || demo::run(interval_ms, true))
        .await
        .map_err(|e| e.to_string())?
        .map_err(|e| format!("demo failed: {e}\n"))?;
    println!(
        "Timers finished: single fired {}, periodic fired {}",
        report.single_fired, report.periodic_fired
    );
    Ok(())
}

pub async fn show_config(ctx: &CliContext) {
    let config = ctx.config.read().await;
    println!("default mode:        {}", config.default_mode);
    println!("default interval:    {}ms", config.default_interval_ms);
    println!("destroy wait mode:   {:?}", config.destroy_wait_mode);
    match config.worker_stack_size {
        Some(bytes) => println!("worker stack size:   {bytes} bytes"),
        None => println!("worker stack size:   platform default"),
    }
    println!("worker name prefix:  {}", config.worker_name_prefix);
}

/// Destroy every remaining timer before the process exits.
pub async fn exit(ctx: &CliContext) {
    let wait_mode = ctx.config.read().await.destroy_wait_mode;
    let timers: Vec<_> = ctx.timers.lock().await.drain().map(|(_, t)| t).collect();
    let count = timers.len();

    let destroyed = tokio::task::spawn_blocking(move || {
        for timer in timers {
            timer.destroy(wait_mode);
        }
    })
    .await;
    if let Err(e) = destroyed {
        tracing::error!(error = %e, "failed to destroy timers on exit");
    }

    tracing::info!(count, "destroyed remaining timers");
    write!(std::io::stdout(), "quitting...").ok();
    std::io::stdout().flush().ok();
}

fn unknown(name: &str) -> String {
    format!("no timer named '{name}'\n")
}
