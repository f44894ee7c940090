//! Phase sequencing: which phase follows the one that just ended

use crate::{config::CycleConfig, state::Phase};

/// Outcome of a phase ending
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub phase: Phase,
    pub duration_seconds: u64,
    /// Work-completion counter after the ending phase is accounted for
    pub completed_work_sessions: u32,
}

/// Decide the next phase and its duration.
///
/// Ending a work phase bumps the counter; every `sessions_before_long_break`-th
/// completion is followed by a long break, the rest by a short break. Any break
/// is followed by work.
pub fn next(current: Phase, completed_work_sessions: u32, config: &CycleConfig) -> Transition {
    match current {
        Phase::Work => {
            let completed = completed_work_sessions.saturating_add(1);
            let phase = if completed % config.sessions_before_long_break() == 0 {
                Phase::LongBreak
            } else {
                Phase::ShortBreak
            };
            Transition {
                phase,
                duration_seconds: config.duration_for(phase),
                completed_work_sessions: completed,
            }
        }
        Phase::ShortBreak | Phase::LongBreak => Transition {
            phase: Phase::Work,
            duration_seconds: config.work_duration_seconds(),
            completed_work_sessions,
        },
    }
}
