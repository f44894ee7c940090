//! Command reader background task

use std::{fmt, io::Write};
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::{
    engine::CommandDispatcher,
    error::{EngineError, InputError},
    services::CommandSource,
};

/// Why the command loop ended
#[derive(Debug)]
pub enum InputExit {
    /// The user asked to quit
    Quit,
    /// The command stream ended or was interrupted
    Terminated(InputError),
    /// Lifecycle shutdown was requested
    Shutdown,
    Failed(EngineError),
    Panicked(String),
}

impl fmt::Display for InputExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputExit::Quit => f.write_str("quit requested"),
            InputExit::Terminated(e) => write!(f, "input closed ({})", e),
            InputExit::Shutdown => f.write_str("shutdown requested"),
            InputExit::Failed(e) => write!(f, "engine failure ({})", e),
            InputExit::Panicked(message) => write!(f, "command loop panicked ({})", message),
        }
    }
}

/// Background task that reads commands and applies them one at a time
pub async fn command_task<S: CommandSource>(
    dispatcher: CommandDispatcher,
    mut source: S,
    mut shutdown: watch::Receiver<bool>,
) -> InputExit {
    info!("Starting command task");

    loop {
        if *shutdown.borrow() {
            return InputExit::Shutdown;
        }

        let line = tokio::select! {
            _ = shutdown.changed() => {
                debug!("Command task interrupted by shutdown");
                return InputExit::Shutdown;
            }
            line = source.next_command() => line,
        };

        let line = match line {
            Ok(line) => line,
            Err(e) => {
                info!("Command input ended: {}", e);
                return InputExit::Terminated(e);
            }
        };

        match dispatcher.dispatch(&line) {
            Ok(Some(outcome)) => {
                print_line(&outcome.to_string());
                if outcome.is_exit() {
                    return InputExit::Quit;
                }
            }
            Ok(None) => {}
            Err(e) => {
                error!("Command '{}' failed: {}", line.trim(), e);
                return InputExit::Failed(e);
            }
        }
    }
}

fn print_line(text: &str) {
    let mut stdout = std::io::stdout().lock();
    // Clear the progress line before replying
    if writeln!(stdout, "\r\x1b[2K{}", text).and_then(|_| stdout.flush()).is_err() {
        debug!("Failed to write to stdout");
    }
}
