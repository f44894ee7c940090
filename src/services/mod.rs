//! External collaborator module
//! 
//! Persistence, notification, command input and log analytics. The engine
//! only talks to these through the traits and handles defined here.

pub mod analytics;
pub mod input;
pub mod notifier;
pub mod recorder;

// Re-export main types
pub use input::{ChannelSource, CommandSource, LineSource, StdinSource};
pub use notifier::{notifier_for, Notifier, SilentNotifier, TerminalBell};
pub use recorder::{JsonLinesLog, Persister, SessionRecorder, DEFAULT_QUEUE_CAPACITY};
