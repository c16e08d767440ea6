mod record;
mod store;

pub use record::{MarkerRecord, TerminalMode};
pub use store::{MarkerEntry, MarkerStore, DEFAULT_MARKER_PREFIX};

use std::io;
use std::path::PathBuf;

/// Failures at the marker store boundary. Never fatal to the caller.
#[derive(Debug, thiserror::Error)]
pub enum MarkerError {
    #[error("failed to write marker {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to remove marker {}: {source}", .path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to list marker directory {}: {source}", .path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read marker {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed marker {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode marker for pid {pid}: {source}")]
    Encode {
        pid: u32,
        #[source]
        source: serde_json::Error,
    },
}
