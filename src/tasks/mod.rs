//! Background tasks module
//! 
//! This module contains the activities the lifecycle controller runs
//! alongside each other: ticking, command reading and display.

pub mod commands;
pub mod display;
pub mod ticker;

// Re-export main functions
pub use commands::{command_task, InputExit};
pub use display::display_task;
pub use ticker::ticker_task;
