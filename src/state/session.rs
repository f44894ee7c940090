//! Completed session records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Phase;

/// Immutable record of a completed or stopped phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    #[serde(rename = "type")]
    pub phase: Phase,
    pub start_time: DateTime<Utc>,
    pub duration_seconds: u64,
}

impl SessionRecord {
    /// Record `duration_seconds` of `phase` begun at `start_time`
    pub fn new(phase: Phase, start_time: DateTime<Utc>, duration_seconds: u64) -> Self {
        Self {
            phase,
            start_time,
            duration_seconds,
        }
    }
}
