//! Shared test utilities for marker integration tests

#![allow(dead_code)]

use std::time::Duration;
use tempfile::TempDir;

use agent_marker::marker::DEFAULT_MARKER_PREFIX;
use agent_marker::{MarkerStore, Orchestrator, TerminalClassifier};

/// Settling delay short enough to keep tests fast
pub const TEST_SETTLE_DELAY: Duration = Duration::from_millis(20);

/// Creates a marker store in its own temporary directory
pub fn create_test_store() -> (TempDir, MarkerStore) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store = MarkerStore::new(temp_dir.path(), DEFAULT_MARKER_PREFIX);
    (temp_dir, store)
}

/// Creates an orchestrator with default patterns over a temporary marker directory
pub fn create_test_orchestrator() -> (TempDir, Orchestrator) {
    let (temp_dir, store) = create_test_store();
    let orchestrator = Orchestrator::new(TerminalClassifier::default(), store, TEST_SETTLE_DELAY);
    (temp_dir, orchestrator)
}

/// Names of all files in the directory
pub fn file_names(dir: &TempDir) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir.path())
        .expect("Failed to read temp dir")
        .map(|e| e.expect("Failed to read entry").file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}
