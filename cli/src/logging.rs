//! Logging configuration with file-based output and size-based rotation.
//!
//! Writes logs to `~/.config/ptimer/ptimer.log` (or platform equivalent) with
//! 5 MB size-based rotation. Set `DEBUG_LOGGING=1` to enable debug output
//! for ptimer crates.

use rolling_file::{BasicRollingFileAppender, RollingConditionBasic};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const MAX_LOG_BYTES: u64 = 5 * 1024 * 1024;

/// Initialize logging: file layer plus stderr for warnings.
///
/// Returns a `WorkerGuard` that MUST be held for the application lifetime
/// to ensure all buffered logs are flushed on shutdown.
///
/// # Fallback
/// If the log directory cannot be created, returns `None` and logs to
/// stderr only.
pub fn init() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let debug_logging = std::env::var("DEBUG_LOGGING").is_ok();

    let log_dir = match dirs::config_dir() {
        Some(config) => config.join("ptimer"),
        None => {
            init_stderr_only(debug_logging);
            return None;
        }
    };

    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        // Can't use tracing yet since subscriber not initialized
        eprintln!(
            "Failed to create log directory {:?}: {}, using stderr only",
            log_dir, e
        );
        init_stderr_only(debug_logging);
        return None;
    }

    let log_path = log_dir.join("ptimer.log");
    let file_appender = match BasicRollingFileAppender::new(
        &log_path,
        RollingConditionBasic::new().max_size(MAX_LOG_BYTES),
        1,
    ) {
        Ok(appender) => appender,
        Err(e) => {
            eprintln!("Failed to create log file at {:?}: {}", log_path, e);
            init_stderr_only(debug_logging);
            return None;
        }
    };

    // Timer workers log from their own threads; keep file writes off them
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_names(true)
        .with_span_events(FmtSpan::NONE);

    // Keep the REPL readable: only warnings and errors reach the terminal
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_span_events(FmtSpan::NONE)
        .with_filter(EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(file_layer.with_filter(filter(debug_logging)))
        .with(stderr_layer)
        .init();

    tracing::info!(
        log_file = ?log_path,
        debug_logging,
        "ptimer logging initialized"
    );

    Some(guard)
}

fn filter(debug_logging: bool) -> EnvFilter {
    if debug_logging {
        EnvFilter::new("info,ptimer_core=debug,ptimer_cli=debug,ptimer=debug")
    } else {
        EnvFilter::new("info")
    }
}

/// Fallback when file logging is unavailable.
fn init_stderr_only(debug_logging: bool) {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_span_events(FmtSpan::NONE);

    tracing_subscriber::registry()
        .with(stderr_layer.with_filter(filter(debug_logging)))
        .init();

    tracing::info!(debug_logging, "ptimer logging initialized (stderr only)");
}
