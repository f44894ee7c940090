//! Terminal display background task

use std::io::Write;
use tokio::sync::{broadcast, watch};
use tracing::{debug, warn};

use crate::state::{timer_state::format_clock, EngineEvent};

/// Background task that renders engine events on stdout
pub async fn display_task(mut events: broadcast::Receiver<EngineEvent>, mut shutdown: watch::Receiver<bool>) {
    debug!("Starting display task");

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            event = events.recv() => match event {
                Ok(event) => show(&event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Display fell behind, skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    debug!("Display task stopped");
}

fn show(event: &EngineEvent) {
    let mut stdout = std::io::stdout().lock();
    let text = render(event);
    let result = if matches!(event, EngineEvent::Progress { .. }) {
        write!(stdout, "\r{}", text)
    } else {
        writeln!(stdout, "\r\x1b[2K{}", text)
    };
    if result.and_then(|_| stdout.flush()).is_err() {
        debug!("Failed to write to stdout");
    }
}

/// One line of terminal text for an event
pub fn render(event: &EngineEvent) -> String {
    match event {
        EngineEvent::SessionStarted { phase, duration_seconds } => {
            format!("Starting {} session: {}", phase, format_clock(*duration_seconds))
        }
        EngineEvent::Progress { phase, remaining_seconds } => {
            format!(" {} remaining [{}]", format_clock(*remaining_seconds), phase)
        }
        EngineEvent::PhaseComplete { completed, next, .. } => {
            format!("{} complete! Next up: {}", capitalize(completed.label()), next)
        }
        EngineEvent::Paused { remaining_seconds } => {
            format!("Timer paused at {}", format_clock(*remaining_seconds))
        }
        EngineEvent::Resumed { remaining_seconds } => {
            format!("Timer resumed at {}", format_clock(*remaining_seconds))
        }
        EngineEvent::Stopped { phase, elapsed_seconds } => {
            format!("{} stopped after {}", capitalize(phase.label()), format_clock(*elapsed_seconds))
        }
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
