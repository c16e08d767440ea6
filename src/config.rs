//! Configuration loaded from `<config_dir>/agent-marker/config.toml`

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::marker::DEFAULT_MARKER_PREFIX;
use crate::terminal::ClassificationPatterns;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding marker files; the platform temp directory if unset
    pub marker_dir: Option<PathBuf>,
    pub marker_prefix: String,
    pub settle_delay_ms: u64,
    /// How often the tmux watcher lists panes
    pub poll_interval_ms: u64,
    pub patterns: ClassificationPatterns,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            marker_dir: None,
            marker_prefix: DEFAULT_MARKER_PREFIX.to_string(),
            settle_delay_ms: 200,
            poll_interval_ms: 1000,
            patterns: ClassificationPatterns::default(),
        }
    }
}

impl Config {
    pub fn global_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("agent-marker")
            .join("config.toml")
    }

    /// Load `explicit` if given, else the global config if it exists, else defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let global = Self::global_config_path();
                if global.exists() {
                    Self::from_file(&global)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        // An empty prefix would make the sweep delete every file in the directory
        if self.marker_prefix.is_empty() {
            anyhow::bail!("marker_prefix must not be empty");
        }
        Ok(())
    }

    pub fn marker_dir(&self) -> PathBuf {
        self.marker_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
