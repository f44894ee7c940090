//! Timer state structure and management

use std::fmt;

use serde::{Deserialize, Serialize};

/// One segment of the work/break cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Work,
    ShortBreak,
    LongBreak,
}

impl Phase {
    pub fn is_break(&self) -> bool {
        !matches!(self, Phase::Work)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Phase::Work => "work",
            Phase::ShortBreak => "short break",
            Phase::LongBreak => "long break",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Timer state shared between the ticker and the command loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerState {
    pub phase: Phase,
    pub remaining_seconds: u64,
    pub configured_duration_seconds: u64,
    pub running: bool,
    pub paused: bool,
    pub completed_work_sessions: u32,
}

impl TimerState {
    /// Create an idle timer state positioned at the start of a work phase
    pub fn new(work_duration_seconds: u64) -> Self {
        Self {
            phase: Phase::Work,
            remaining_seconds: work_duration_seconds,
            configured_duration_seconds: work_duration_seconds,
            running: false,
            paused: false,
            completed_work_sessions: 0,
        }
    }

    /// Read-only view for status reports
    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            phase: self.phase,
            remaining_seconds: self.remaining_seconds,
            paused: self.paused,
            running: self.running,
            completed_work_sessions: self.completed_work_sessions,
        }
    }
}

/// Read-only view returned by the `status` command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub phase: Phase,
    pub remaining_seconds: u64,
    pub paused: bool,
    pub running: bool,
    pub completed_work_sessions: u32,
}

impl fmt::Display for StatusSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match (self.running, self.paused) {
            (false, _) => "stopped",
            (true, true) => "paused",
            (true, false) => "running",
        };
        write!(
            f,
            "{} {} ({} remaining, {} work sessions completed)",
            self.phase,
            state,
            format_clock(self.remaining_seconds),
            self.completed_work_sessions
        )
    }
}

/// Format seconds as `MM:SS`
pub fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
