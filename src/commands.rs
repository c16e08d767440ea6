use std::fmt;

use tracing::warn;

use crate::marker::{MarkerEntry, MarkerRecord};
use crate::orchestrator::Orchestrator;
use crate::terminal::Terminal;

/// User-invoked actions on the host's active terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Classify the active terminal, marking it if it is an agent
    DetectActive,
    /// Write a marker for the active terminal regardless of classification
    CreateMarker,
    /// Report every marker in the store
    ShowStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

/// Message the host shows to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

const NO_ACTIVE_TERMINAL: &str = "No active terminal found";

/// Run a command against the host's active terminal
pub async fn execute(
    orchestrator: &Orchestrator,
    command: Command,
    active: Option<&Terminal>,
) -> Notification {
    match command {
        Command::DetectActive => match active {
            Some(terminal) => detect(orchestrator, terminal).await,
            None => Notification::warning(NO_ACTIVE_TERMINAL),
        },
        Command::CreateMarker => match active {
            Some(terminal) => create_marker(orchestrator, terminal).await,
            None => Notification::warning(NO_ACTIVE_TERMINAL),
        },
        Command::ShowStatus => show_status(orchestrator).await,
    }
}

async fn detect(orchestrator: &Orchestrator, terminal: &Terminal) -> Notification {
    if !orchestrator.classify_and_register(terminal) {
        return Notification::info("Terminal is not from an agent");
    }

    if terminal.try_process_id().is_some() {
        orchestrator.write_marker(terminal).await;
        return Notification::info("Agent terminal detected and marker file created");
    }

    // Same path as a freshly opened terminal: write once the pid resolves
    let this = orchestrator.clone();
    let terminal = terminal.clone();
    tokio::spawn(async move { this.write_marker(&terminal).await });
    Notification::info("Agent terminal detected, marker will be created once its process starts")
}

async fn create_marker(orchestrator: &Orchestrator, terminal: &Terminal) -> Notification {
    let Some(pid) = terminal.try_process_id() else {
        return Notification::warning("Cannot create marker file: process ID not available yet");
    };

    let record = MarkerRecord::new(pid, terminal.name());
    match orchestrator.store().write(&record).await {
        Ok(_) => Notification::info(format!(
            "Marker file created manually for active terminal (PID {pid})"
        )),
        Err(e) => {
            warn!(pid, error = %e, "manual marker creation failed");
            Notification::error(format!("Failed to create marker file: {e}"))
        }
    }
}

async fn show_status(orchestrator: &Orchestrator) -> Notification {
    let entries = match orchestrator.store().list_all().await {
        Ok(entries) => entries,
        Err(e) => return Notification::error(format!("Failed to check marker files: {e}")),
    };

    if entries.is_empty() {
        return Notification::info("No agent marker files found");
    }

    let summary = entries
        .iter()
        .map(|entry| match entry {
            MarkerEntry::Parsed { record, .. } => {
                format!("PID {}: {}", record.process_id, record.terminal_name)
            }
            MarkerEntry::Unreadable { file_name, .. } => format!("{file_name}: (unreadable)"),
        })
        .collect::<Vec<_>>()
        .join(", ");

    Notification::info(format!("Agent marker files ({}): {}", entries.len(), summary))
}
