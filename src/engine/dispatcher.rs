//! Command dispatcher: turns one line of user input into a clock mutation
//! or a status report

use std::{fmt, sync::Arc};

use tracing::debug;

use super::clock::{ClockDriver, Effect};
use crate::{
    error::{EngineError, Precondition},
    state::{timer_state::format_clock, Phase, SessionRecord, StatusSnapshot},
};

pub const HELP: &str = "Commands: start | pause | resume | skip | stop | reset | status | help | quit";

/// A recognized (or unrecognized) command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Pause,
    Resume,
    Skip,
    Stop { reset_cycle: bool },
    Status,
    Help,
    Quit,
    Unknown(String),
}

impl Command {
    /// Parse a line; blank lines yield `None`
    pub fn parse(input: &str) -> Option<Self> {
        let normalized = input.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
        let command = match normalized.as_str() {
            "" => return None,
            "start" => Command::Start,
            "pause" => Command::Pause,
            "resume" => Command::Resume,
            "skip" => Command::Skip,
            "stop" => Command::Stop { reset_cycle: false },
            "reset" | "stop reset" => Command::Stop { reset_cycle: true },
            "status" => Command::Status,
            "help" => Command::Help,
            "quit" | "exit" => Command::Quit,
            _ => Command::Unknown(input.trim().to_string()),
        };
        Some(command)
    }
}

/// What a dispatched command did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Started(StatusSnapshot),
    Paused(StatusSnapshot),
    Resumed(StatusSnapshot),
    Skipped(StatusSnapshot),
    Stopped {
        record: Option<SessionRecord>,
        cycle_reset: bool,
    },
    Status(StatusSnapshot),
    Help,
    Quit(Option<SessionRecord>),
    NoOp(Precondition),
    Unknown(String),
}

impl CommandOutcome {
    /// Whether the command loop should end after this outcome
    pub fn is_exit(&self) -> bool {
        matches!(self, CommandOutcome::Quit(_))
    }
}

impl fmt::Display for CommandOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandOutcome::Started(s) => write!(f, "Started {} ({})", s.phase, format_clock(s.remaining_seconds)),
            CommandOutcome::Paused(s) => write!(f, "Paused at {}", format_clock(s.remaining_seconds)),
            CommandOutcome::Resumed(s) => write!(f, "Resumed at {}", format_clock(s.remaining_seconds)),
            CommandOutcome::Skipped(s) => write!(f, "Skipping {}", s.phase),
            CommandOutcome::Stopped { record, cycle_reset } => {
                match record {
                    Some(r) => write!(f, "Stopped {} after {}", r.phase, format_clock(r.duration_seconds))?,
                    None => f.write_str("Nothing running")?,
                }
                if *cycle_reset {
                    f.write_str("; cycle reset")?;
                }
                Ok(())
            }
            CommandOutcome::Status(s) => write!(f, "{}", s),
            CommandOutcome::Help => f.write_str(HELP),
            CommandOutcome::Quit(_) => f.write_str("Goodbye!"),
            CommandOutcome::NoOp(reason) => write!(f, "Ignored: {}", reason),
            CommandOutcome::Unknown(input) => write!(f, "Unknown command: {} (try 'help')", input),
        }
    }
}

/// Applies commands to a shared clock driver
#[derive(Clone)]
pub struct CommandDispatcher {
    engine: Arc<ClockDriver>,
}

impl CommandDispatcher {
    /// Dispatch commands against `engine`
    pub fn new(engine: Arc<ClockDriver>) -> Self {
        Self { engine }
    }

    /// Parse and apply one line of input; blank lines do nothing
    pub fn dispatch(&self, input: &str) -> Result<Option<CommandOutcome>, EngineError> {
        match Command::parse(input) {
            Some(command) => self.apply(command).map(Some),
            None => Ok(None),
        }
    }

    /// Apply a parsed command.
    ///
    /// Commands that do not fit the current state come back as
    /// `CommandOutcome::NoOp`; only engine failures are errors.
    pub fn apply(&self, command: Command) -> Result<CommandOutcome, EngineError> {
        let outcome = match command {
            Command::Start => {
                let work = self.engine.config().work_duration_seconds();
                match self.engine.start(work, Phase::Work) {
                    Ok(snapshot) => CommandOutcome::Started(snapshot),
                    Err(EngineError::AlreadyRunning) => CommandOutcome::NoOp(Precondition::AlreadyRunning),
                    Err(e) => return Err(e),
                }
            }
            Command::Pause => match self.engine.pause()? {
                Effect::Applied(snapshot) => CommandOutcome::Paused(snapshot),
                Effect::NoOp(reason) => CommandOutcome::NoOp(reason),
            },
            Command::Resume => match self.engine.resume()? {
                Effect::Applied(snapshot) => CommandOutcome::Resumed(snapshot),
                Effect::NoOp(reason) => CommandOutcome::NoOp(reason),
            },
            Command::Skip => match self.engine.skip()? {
                Effect::Applied(snapshot) => CommandOutcome::Skipped(snapshot),
                Effect::NoOp(reason) => CommandOutcome::NoOp(reason),
            },
            Command::Stop { reset_cycle } => CommandOutcome::Stopped {
                record: self.engine.stop(reset_cycle)?,
                cycle_reset: reset_cycle,
            },
            Command::Status => CommandOutcome::Status(self.engine.status()?),
            Command::Help => CommandOutcome::Help,
            Command::Quit => CommandOutcome::Quit(self.engine.stop(false)?),
            Command::Unknown(input) => CommandOutcome::Unknown(input),
        };

        debug!("Command outcome: {:?}", outcome);
        Ok(outcome)
    }
}
