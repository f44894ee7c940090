//! Pomodoro Timer - a work/break session timer driven from the terminal
//! 
//! This library provides the clock driver and phase sequencing for the
//! work/break cycle, a command dispatcher that serializes user commands
//! against the ticking clock, and the lifecycle plumbing that runs both
//! concurrently and shuts them down cleanly.

pub mod config;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod services;
pub mod state;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use config::{Config, CycleConfig, Settings};
pub use engine::{ClockDriver, CommandDispatcher, CommandOutcome};
pub use error::{EngineError, Precondition};
pub use lifecycle::Lifecycle;
pub use state::{EngineEvent, Phase, SessionRecord, StatusSnapshot, TimerState};
pub use utils::signals::shutdown_signal;
