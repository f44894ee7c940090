//! Phase-change notifications

use std::{
    io::{self, Write},
    sync::Arc,
};

use tracing::trace;

use crate::state::Phase;

/// Fire-and-forget hook called whenever a phase begins.
///
/// Implementations must return promptly and swallow their own failures.
pub trait Notifier: Send + Sync {
    fn notify_phase_started(&self, phase: Phase);
}

/// Rings the terminal bell on stderr: once for work, twice for a break
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalBell;

impl TerminalBell {
    /// Bytes written to the terminal when `phase` begins
    pub fn pattern(phase: Phase) -> &'static [u8] {
        if phase.is_break() {
            b"\x07\x07"
        } else {
            b"\x07"
        }
    }
}

impl Notifier for TerminalBell {
    fn notify_phase_started(&self, phase: Phase) {
        let mut stderr = io::stderr();
        if let Err(e) = stderr.write_all(Self::pattern(phase)).and_then(|_| stderr.flush()) {
            trace!("Bell for {} phase failed: {}", phase, e);
        }
    }
}

/// Does nothing; used when sound is disabled
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn notify_phase_started(&self, _phase: Phase) {}
}

/// Pick the notifier matching the sound setting
pub fn notifier_for(sound_enabled: bool) -> Arc<dyn Notifier> {
    if sound_enabled {
        Arc::new(TerminalBell)
    } else {
        Arc::new(SilentNotifier)
    }
}
