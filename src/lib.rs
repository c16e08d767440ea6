//! Agent terminal detection.
//!
//! Terminal sessions reported by a host are classified as agent-originated or
//! standard shells. Agent sessions get a small JSON marker file keyed by their
//! process id in a shared directory, so other processes can ask "is pid N an
//! agent terminal?" by reading the directory.

pub mod actions;
pub mod commands;
pub mod config;
pub mod marker;
pub mod orchestrator;
pub mod registry;
pub mod terminal;
pub mod tmux;

pub use actions::HostEvent;
pub use commands::{Command, Notification, NotificationLevel};
pub use config::Config;
pub use marker::{MarkerEntry, MarkerError, MarkerRecord, MarkerStore};
pub use orchestrator::Orchestrator;
pub use registry::SessionRegistry;
pub use terminal::{
    ClassificationPatterns, CreationMetadata, ProcessIdSender, SessionId, Terminal,
    TerminalClassifier,
};
