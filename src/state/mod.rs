//! State management module
//! 
//! This module contains the timer state, the records it produces and the
//! events it emits to observers.

pub mod timer_state;
pub mod session;
pub mod events;

// Re-export main types
pub use timer_state::{Phase, StatusSnapshot, TimerState};
pub use session::SessionRecord;
pub use events::EngineEvent;
