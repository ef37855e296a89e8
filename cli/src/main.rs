use ptimer_cli::{CliContext, commands, logging, readline, respond};
use std::io::Write;

#[tokio::main]
async fn main() -> Result<(), String> {
    let _log_guard = logging::init();
    let ctx = CliContext::new();

    loop {
        let Some(line) = readline()? else {
            commands::exit(&ctx).await;
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match respond(line, &ctx).await {
            Ok(quit) => {
                if quit {
                    break;
                }
            }
            Err(err) => {
                write!(std::io::stdout(), "{err}").map_err(|e| e.to_string())?;
                std::io::stdout().flush().map_err(|e| e.to_string())?;
            }
        }
    }

    Ok(())
}
