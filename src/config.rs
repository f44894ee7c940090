//! Configuration and CLI argument handling

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::{debug, info};

use crate::{error::ConfigError, state::Phase};

const DEFAULT_WORK_MINUTES: u64 = 25;
const DEFAULT_SHORT_BREAK_MINUTES: u64 = 5;
const DEFAULT_LONG_BREAK_MINUTES: u64 = 15;
const DEFAULT_SESSIONS_BEFORE_LONG_BREAK: u32 = 4;
const DEFAULT_LOG_FILE: &str = "session_log.jsonl";
const MAX_PHASE_MINUTES: u64 = 120;

/// CLI argument parsing structure
#[derive(Parser, Debug)]
#[command(name = "pomodoro-timer")]
#[command(about = "A terminal work/break session timer")]
#[command(version)]
pub struct Config {
    #[command(subcommand)]
    pub command: Option<Mode>,

    /// Work session length in minutes
    #[arg(short, long, global = true)]
    pub work: Option<u64>,

    /// Short break length in minutes
    #[arg(long, global = true)]
    pub short_break: Option<u64>,

    /// Long break length in minutes
    #[arg(long, global = true)]
    pub long_break: Option<u64>,

    /// Number of work sessions before a long break
    #[arg(long, global = true)]
    pub sessions_before_long_break: Option<u32>,

    /// Session log file (one JSON object per line)
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Optional TOML config file; CLI flags take precedence over its values
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Disable the phase-change bell
    #[arg(long, global = true)]
    pub no_sound: bool,

    /// Length of one tick in milliseconds
    #[arg(long, default_value = "1000", hide = true)]
    pub tick_millis: u64,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Run the work/break cycle (default)
    Run,
    /// Print a summary of the session log
    Stats {
        /// Number of recent sessions to list
        #[arg(long, default_value = "5")]
        recent: usize,
    },
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    pub fn mode(&self) -> Mode {
        self.command.unwrap_or(Mode::Run)
    }

    /// Merge CLI flags over the optional config file and validate the result
    pub fn resolve(&self) -> Result<Settings, ConfigError> {
        let file = match &self.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        self.resolve_with(file)
    }

    fn resolve_with(&self, file: FileConfig) -> Result<Settings, ConfigError> {
        let work = self.work.or(file.timer.work_minutes).unwrap_or(DEFAULT_WORK_MINUTES);
        let short_break = self
            .short_break
            .or(file.timer.short_break_minutes)
            .unwrap_or(DEFAULT_SHORT_BREAK_MINUTES);
        let long_break = self
            .long_break
            .or(file.timer.long_break_minutes)
            .unwrap_or(DEFAULT_LONG_BREAK_MINUTES);
        let sessions = self
            .sessions_before_long_break
            .or(file.timer.sessions_before_long_break)
            .unwrap_or(DEFAULT_SESSIONS_BEFORE_LONG_BREAK);

        validate_minutes(work, "Work duration")?;
        validate_minutes(short_break, "Short break duration")?;
        validate_minutes(long_break, "Long break duration")?;
        if sessions == 0 {
            return Err(ConfigError::Invalid(
                "Sessions before long break must be at least 1, got: 0".to_string(),
            ));
        }
        if self.tick_millis == 0 {
            return Err(ConfigError::Invalid(
                "Tick length must be at least 1ms, got: 0".to_string(),
            ));
        }

        let settings = Settings {
            cycle: CycleConfig::from_minutes(work, short_break, long_break, sessions)?,
            sound_enabled: !self.no_sound && file.sound.enabled.unwrap_or(true),
            log_file: self
                .log_file
                .clone()
                .or(file.log.file)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE)),
            tick_interval: Duration::from_millis(self.tick_millis),
        };
        debug!("Resolved settings: {:?}", settings);
        Ok(settings)
    }
}

fn validate_minutes(value: u64, field: &str) -> Result<(), ConfigError> {
    if value == 0 || value > MAX_PHASE_MINUTES {
        return Err(ConfigError::Invalid(format!(
            "{} must be between 1 and {} minutes, got: {}",
            field, MAX_PHASE_MINUTES, value
        )));
    }
    Ok(())
}

/// Everything the binary needs once arguments and file are merged
#[derive(Debug, Clone)]
pub struct Settings {
    pub cycle: CycleConfig,
    pub sound_enabled: bool,
    pub log_file: PathBuf,
    pub tick_interval: Duration,
}

/// Phase lengths and cadence, fixed for the lifetime of an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleConfig {
    work_seconds: u64,
    short_break_seconds: u64,
    long_break_seconds: u64,
    sessions_before_long_break: u32,
}

impl CycleConfig {
    /// Build a cycle from phase lengths in seconds.
    ///
    /// Every phase must last at least one second; a cadence of 0 is treated as 1.
    pub fn new(
        work_seconds: u64,
        short_break_seconds: u64,
        long_break_seconds: u64,
        sessions_before_long_break: u32,
    ) -> Result<Self, ConfigError> {
        for (seconds, field) in [
            (work_seconds, "Work duration"),
            (short_break_seconds, "Short break duration"),
            (long_break_seconds, "Long break duration"),
        ] {
            if seconds == 0 {
                return Err(ConfigError::Invalid(format!("{} must be at least 1 second, got: 0", field)));
            }
        }

        Ok(Self {
            work_seconds,
            short_break_seconds,
            long_break_seconds,
            sessions_before_long_break: sessions_before_long_break.max(1),
        })
    }

    /// Build a cycle from phase lengths in minutes
    pub fn from_minutes(work: u64, short_break: u64, long_break: u64, sessions: u32) -> Result<Self, ConfigError> {
        Self::new(work * 60, short_break * 60, long_break * 60, sessions)
    }

    pub fn work_duration_seconds(&self) -> u64 {
        self.work_seconds
    }

    pub fn short_break_duration_seconds(&self) -> u64 {
        self.short_break_seconds
    }

    pub fn long_break_duration_seconds(&self) -> u64 {
        self.long_break_seconds
    }

    pub fn sessions_before_long_break(&self) -> u32 {
        self.sessions_before_long_break
    }

    /// Configured length of `phase` in seconds
    pub fn duration_for(&self, phase: Phase) -> u64 {
        match phase {
            Phase::Work => self.work_seconds,
            Phase::ShortBreak => self.short_break_seconds,
            Phase::LongBreak => self.long_break_seconds,
        }
    }
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            work_seconds: DEFAULT_WORK_MINUTES * 60,
            short_break_seconds: DEFAULT_SHORT_BREAK_MINUTES * 60,
            long_break_seconds: DEFAULT_LONG_BREAK_MINUTES * 60,
            sessions_before_long_break: DEFAULT_SESSIONS_BEFORE_LONG_BREAK,
        }
    }
}

/// On-disk TOML layout; every key is optional
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub timer: TimerSection,
    pub sound: SoundSection,
    pub log: LogSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TimerSection {
    pub work_minutes: Option<u64>,
    pub short_break_minutes: Option<u64>,
    pub long_break_minutes: Option<u64>,
    pub sessions_before_long_break: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SoundSection {
    pub enabled: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LogSection {
    pub file: Option<PathBuf>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let parsed = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loaded configuration from {}", path.display());
        Ok(parsed)
    }
}
