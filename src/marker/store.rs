use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::{MarkerError, MarkerRecord};

/// File name prefix shared with every reader of the marker directory
pub const DEFAULT_MARKER_PREFIX: &str = ".vscode_copilot_agent_";

/// One file found while enumerating the marker directory
#[derive(Debug)]
pub enum MarkerEntry {
    Parsed {
        file_name: String,
        record: MarkerRecord,
    },
    Unreadable {
        file_name: String,
        error: MarkerError,
    },
}

impl MarkerEntry {
    pub fn file_name(&self) -> &str {
        match self {
            Self::Parsed { file_name, .. } | Self::Unreadable { file_name, .. } => file_name,
        }
    }

    pub fn record(&self) -> Option<&MarkerRecord> {
        match self {
            Self::Parsed { record, .. } => Some(record),
            Self::Unreadable { .. } => None,
        }
    }
}

/// One marker file per agent process id, `<prefix><pid>`, in a shared directory.
///
/// No locking: distinct pids map to distinct files, and a write racing a sweep
/// on the same pid only ever loses or leaves one small file.
#[derive(Debug, Clone)]
pub struct MarkerStore {
    dir: PathBuf,
    prefix: String,
}

impl MarkerStore {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    /// Store in the platform temp directory with the default prefix
    pub fn in_temp_dir() -> Self {
        Self::new(std::env::temp_dir(), DEFAULT_MARKER_PREFIX)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn marker_path(&self, pid: u32) -> PathBuf {
        self.dir.join(format!("{}{}", self.prefix, pid))
    }

    /// Create or overwrite the marker for `record.process_id`
    pub async fn write(&self, record: &MarkerRecord) -> Result<PathBuf, MarkerError> {
        let pid = record.process_id;
        let path = self.marker_path(pid);
        let json =
            serde_json::to_string(record).map_err(|source| MarkerError::Encode { pid, source })?;

        tokio::fs::write(&path, json)
            .await
            .map_err(|source| MarkerError::Write {
                path: path.clone(),
                source,
            })?;

        info!(pid, path = %path.display(), "created agent marker");
        Ok(path)
    }

    /// Delete the marker for `pid`. Returns whether a file was removed; a
    /// missing file is not an error.
    pub async fn remove(&self, pid: u32) -> Result<bool, MarkerError> {
        let path = self.marker_path(pid);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!(pid, path = %path.display(), "removed agent marker");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(pid, "no marker to remove");
                Ok(false)
            }
            Err(source) => Err(MarkerError::Remove { path, source }),
        }
    }

    /// Read the marker for one pid, `None` if there is none
    pub async fn read(&self, pid: u32) -> Result<Option<MarkerRecord>, MarkerError> {
        let path = self.marker_path(pid);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => parse_record(&path, &content).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(MarkerError::Read { path, source }),
        }
    }

    /// Delete every file carrying the marker prefix, whatever pid it names.
    ///
    /// Per-file failures are logged and skipped. Returns the number of files
    /// actually removed.
    pub async fn remove_all(&self) -> Result<usize, MarkerError> {
        let mut removed = 0;
        for file_name in self.marker_file_names().await? {
            let path = self.dir.join(&file_name);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    debug!(path = %path.display(), "removed agent marker");
                    removed += 1;
                }
                Err(e) => warn!(path = %path.display(), error = %e, "failed to remove marker"),
            }
        }
        info!(removed, dir = %self.dir.display(), "swept agent markers");
        Ok(removed)
    }

    /// Enumerate and parse every marker, sorted by file name. A file that
    /// cannot be read or decoded shows up as `Unreadable` without stopping the
    /// rest of the listing.
    pub async fn list_all(&self) -> Result<Vec<MarkerEntry>, MarkerError> {
        let mut entries = Vec::new();
        for file_name in self.marker_file_names().await? {
            let path = self.dir.join(&file_name);
            let entry = match tokio::fs::read_to_string(&path).await {
                Ok(content) => match parse_record(&path, &content) {
                    Ok(record) => MarkerEntry::Parsed { file_name, record },
                    Err(error) => MarkerEntry::Unreadable { file_name, error },
                },
                Err(source) => MarkerEntry::Unreadable {
                    file_name,
                    error: MarkerError::Read { path, source },
                },
            };
            entries.push(entry);
        }
        Ok(entries)
    }

    async fn marker_file_names(&self) -> Result<Vec<String>, MarkerError> {
        let read_dir_err = |source: std::io::Error| MarkerError::ReadDir {
            path: self.dir.clone(),
            source,
        };

        let mut dir = tokio::fs::read_dir(&self.dir).await.map_err(read_dir_err)?;
        let mut names = Vec::new();
        while let Some(entry) = dir.next_entry().await.map_err(read_dir_err)? {
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if name.starts_with(&self.prefix) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}

fn parse_record(path: &Path, content: &str) -> Result<MarkerRecord, MarkerError> {
    serde_json::from_str(content).map_err(|source| MarkerError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
