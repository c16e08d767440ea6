use crate::terminal::Terminal;

/// Lifecycle events delivered by the host
#[derive(Debug, Clone)]
pub enum HostEvent {
    /// A terminal was opened
    SessionOpened(Terminal),
    /// A terminal was closed; carries the same handle delivered on open
    SessionClosed(Terminal),
    /// The host failed to report its terminals
    Error(String),
    /// The host is shutting down
    Shutdown,
}
