//! Error types for the session timer.
//!
//! Only `EngineError` and `ConfigError` ever reach a caller as `Err`. The
//! others describe non-fatal conditions that are logged where they happen.

use std::{io, path::PathBuf};
use thiserror::Error;

/// Failures of the clock driver itself.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineError {
    #[error("a session is already running")]
    AlreadyRunning,

    #[error("session duration must be greater than zero")]
    InvalidDuration,

    /// Another activity panicked while holding the timer state lock
    #[error("timer state lock poisoned")]
    StatePoisoned,
}

/// Why a command was not applicable in the current state.
///
/// These are reported back to the user as a no-op, never treated as failures.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    #[error("no session is running")]
    NotRunning,

    #[error("session is already paused")]
    AlreadyPaused,

    #[error("session is not paused")]
    NotPaused,

    #[error("a session is already running")]
    AlreadyRunning,
}

/// A completed session could not be handed off to the persister.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordError {
    #[error("session record queue is full")]
    QueueFull,

    #[error("session recorder is closed")]
    Closed,
}

/// A background activity did not stop cleanly during shutdown.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShutdownError {
    #[error("{activity} did not stop within {millis}ms and was abandoned")]
    TimedOut { activity: &'static str, millis: u64 },

    #[error("{activity} panicked: {message}")]
    Panicked {
        activity: &'static str,
        message: String,
    },
}

/// The command stream ended.
#[derive(Error, Debug)]
pub enum InputError {
    #[error("end of input")]
    EndOfInput,

    #[error("input interrupted")]
    Interrupted,

    #[error("failed to read command: {0}")]
    Io(#[source] io::Error),
}

impl From<io::Error> for InputError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::Interrupted => InputError::Interrupted,
            io::ErrorKind::UnexpectedEof => InputError::EndOfInput,
            _ => InputError::Io(e),
        }
    }
}

/// Configuration loading and validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("{0}")]
    Invalid(String),
}
