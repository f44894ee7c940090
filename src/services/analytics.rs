//! Session log analytics for the `stats` subcommand

use std::{
    fmt,
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
};

use chrono::{Local, NaiveDate};
use tracing::{debug, warn};

use crate::state::SessionRecord;

/// Load every well-formed record from a JSON-lines session log.
///
/// A missing file is an empty history; malformed lines are skipped.
pub fn load_sessions(path: &Path) -> io::Result<Vec<SessionRecord>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("No session log at {}", path.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(e),
    };

    let mut sessions = Vec::new();
    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<SessionRecord>(&line) {
            Ok(record) => sessions.push(record),
            Err(e) => warn!("Skipping malformed log line {}: {}", number + 1, e),
        }
    }
    Ok(sessions)
}

/// Aggregates over a session history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub work_sessions: usize,
    pub break_sessions: usize,
    pub total_work_seconds: u64,
    pub total_break_seconds: u64,
    pub average_work_seconds: u64,
    pub average_break_seconds: u64,
    pub today_work_sessions: usize,
    pub today_work_seconds: u64,
    pub recent: Vec<SessionRecord>,
}

/// Aggregate `sessions`, with work started on the local date `today` counted
/// separately and the last `recent` sessions kept for listing
pub fn summarize(sessions: &[SessionRecord], today: NaiveDate, recent: usize) -> Summary {
    let (work, breaks): (Vec<&SessionRecord>, Vec<&SessionRecord>) =
        sessions.iter().partition(|s| !s.phase.is_break());

    let total_work_seconds: u64 = work.iter().map(|s| s.duration_seconds).sum();
    let total_break_seconds: u64 = breaks.iter().map(|s| s.duration_seconds).sum();
    let today_work: Vec<&&SessionRecord> = work
        .iter()
        .filter(|s| s.start_time.with_timezone(&Local).date_naive() == today)
        .collect();

    Summary {
        work_sessions: work.len(),
        break_sessions: breaks.len(),
        total_work_seconds,
        total_break_seconds,
        average_work_seconds: average(total_work_seconds, work.len()),
        average_break_seconds: average(total_break_seconds, breaks.len()),
        today_work_sessions: today_work.len(),
        today_work_seconds: today_work.iter().map(|s| s.duration_seconds).sum(),
        recent: sessions[sessions.len().saturating_sub(recent)..].to_vec(),
    }
}

/// Summarize the log at `path` as of the local date
pub fn summarize_file(path: &Path, recent: usize) -> io::Result<Summary> {
    let sessions = load_sessions(path)?;
    Ok(summarize(&sessions, Local::now().date_naive(), recent))
}

fn average(total: u64, count: usize) -> u64 {
    if count == 0 { 0 } else { total / count as u64 }
}

/// Format seconds as `Hh MMm`, or `Mm` under an hour
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    if hours > 0 {
        format!("{}h {:02}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Today")?;
        writeln!(f, "  Sessions completed:   {}", self.today_work_sessions)?;
        writeln!(f, "  Focus time:           {}", format_duration(self.today_work_seconds))?;
        writeln!(f, "Overall")?;
        writeln!(f, "  Focus sessions:       {}", self.work_sessions)?;
        writeln!(f, "  Break sessions:       {}", self.break_sessions)?;
        writeln!(f, "  Focus time:           {}", format_duration(self.total_work_seconds))?;
        writeln!(f, "  Break time:           {}", format_duration(self.total_break_seconds))?;
        writeln!(f, "Averages")?;
        writeln!(f, "  Focus length:         {}", format_duration(self.average_work_seconds))?;
        write!(f, "  Break length:         {}", format_duration(self.average_break_seconds))?;

        if !self.recent.is_empty() {
            write!(f, "\nRecent sessions (last {})", self.recent.len())?;
            for session in &self.recent {
                write!(
                    f,
                    "\n  {:<12} {}  {}",
                    session.phase.label(),
                    session.start_time.with_timezone(&Local).format("%b %d %H:%M"),
                    format_duration(session.duration_seconds)
                )?;
            }
        }
        Ok(())
    }
}
