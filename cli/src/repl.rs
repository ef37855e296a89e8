use crate::commands;
use crate::context::CliContext;
use clap::{Parser, Subcommand};
use ptimer_core::TimerMode;
use std::io::Write;

/// Print a prompt and read one line. `None` on end of input.
pub fn readline() -> Result<Option<String>, String> {
    write!(std::io::stdout(), "ptimer> ").map_err(|e| e.to_string())?;
    std::io::stdout().flush().map_err(|e| e.to_string())?;

    let mut buffer = String::new();
    let read = std::io::stdin()
        .read_line(&mut buffer)
        .map_err(|e| e.to_string())?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(buffer))
}

#[derive(Parser)]
#[command(version, about = "interactive timer playground")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Create an idle timer
    Create {
        #[arg(short, long)]
        name: String,
        /// single | periodic (defaults to config)
        #[arg(short, long)]
        mode: Option<TimerMode>,
        /// Interval in milliseconds (defaults to config)
        #[arg(short, long)]
        interval: Option<u64>,
        /// Stop from inside the callback after this many fires
        #[arg(long)]
        stop_after: Option<u64>,
        /// Don't print a line on every fire
        #[arg(short, long)]
        quiet: bool,
    },
    Start {
        #[arg(short, long)]
        name: String,
    },
    Stop {
        #[arg(short, long)]
        name: String,
    },
    SetTimeout {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        interval: u64,
    },
    Status {
        #[arg(short, long)]
        name: Option<String>,
    },
    Destroy {
        #[arg(short, long)]
        name: String,
        #[arg(long)]
        no_wait: bool,
    },
    Sleep {
        #[arg(long)]
        ms: u64,
    },
    /// Single-shot greeting, then a periodic timer that stops itself
    Demo {
        #[arg(short, long, default_value_t = ptimer_core::seconds(1))]
        interval: u64,
    },
    Config,
    Exit,
}

/// Parse one REPL line the way a shell would.
pub fn parse_line(line: &str) -> Result<Cli, String> {
    let mut args = shlex::split(line).ok_or("error: Invalid quoting")?;
    args.insert(0, "ptimer".to_string());
    Cli::try_parse_from(args).map_err(|e| e.to_string())
}

/// Run one line. Returns `Ok(true)` when the REPL should quit.
pub async fn respond(line: &str, ctx: &CliContext) -> Result<bool, String> {
    let cli = parse_line(line)?;

    match cli.command {
        Some(Commands::Create {
            name,
            mode,
            interval,
            stop_after,
            quiet,
        }) => commands::create_timer(ctx, &name, mode, interval, stop_after, quiet).await?,
        Some(Commands::Start { name }) => commands::start_timer(ctx, &name).await?,
        Some(Commands::Stop { name }) => commands::stop_timer(ctx, &name).await?,
        Some(Commands::SetTimeout { name, interval }) => {
            commands::set_timeout(ctx, &name, interval).await?
        }
        Some(Commands::Status { name }) => commands::show_status(ctx, name.as_deref()).await?,
        Some(Commands::Destroy { name, no_wait }) => {
            commands::destroy_timer(ctx, &name, no_wait).await?
        }
        Some(Commands::Sleep { ms }) => commands::sleep(ms).await,
        Some(Commands::Demo { interval }) => commands::run_demo(interval).await?,
        Some(Commands::Config) => commands::show_config(ctx).await,
        Some(Commands::Exit) => {
            commands::exit(ctx).await;
            return Ok(true);
        }
        None => {}
    }
    Ok(false)
}
