//! Observable events emitted by the clock driver

use serde::{Deserialize, Serialize};

use super::Phase;

/// Events broadcast to display, sound and analytics observers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    SessionStarted {
        phase: Phase,
        duration_seconds: u64,
    },
    Progress {
        phase: Phase,
        remaining_seconds: u64,
    },
    PhaseComplete {
        completed: Phase,
        next: Phase,
        next_duration_seconds: u64,
    },
    Paused {
        remaining_seconds: u64,
    },
    Resumed {
        remaining_seconds: u64,
    },
    Stopped {
        phase: Phase,
        elapsed_seconds: u64,
    },
}
