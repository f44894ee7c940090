//! Timer engine module
//! 
//! The clock driver owns the countdown, the sequencer decides what comes
//! next, and the dispatcher maps user commands onto the clock.

pub mod clock;
pub mod dispatcher;
pub mod sequencer;

// Re-export main types
pub use clock::{ClockDriver, Effect, TickOutcome};
pub use dispatcher::{Command, CommandDispatcher, CommandOutcome};
pub use sequencer::Transition;
