use anyhow::{Context, Result};
use std::collections::HashMap;
use std::process::Stdio;
use tokio::process::Command;

use super::TmuxPane;

// window_name goes last: it is the only field that may contain the separator
const PANE_FORMAT: &str =
    "#{pane_id}|#{pane_pid}|#{pane_active}|#{window_active}|#{session_attached}|#{session_name}|#{window_name}";

/// Client for interacting with tmux via CLI
pub struct TmuxClient {
    /// Path to tmux binary
    tmux_path: String,
}

impl TmuxClient {
    pub fn new() -> Self {
        Self {
            tmux_path: "tmux".to_string(),
        }
    }

    /// Check if tmux server is running
    pub async fn is_server_running(&self) -> bool {
        Command::new(&self.tmux_path)
            .arg("list-sessions")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// List every pane of every session
    pub async fn list_panes(&self) -> Result<Vec<TmuxPane>> {
        let output = Command::new(&self.tmux_path)
            .args(["list-panes", "-a", "-F", PANE_FORMAT])
            .output()
            .await
            .context("Failed to execute tmux list-panes")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("no server running") || stderr.contains("no sessions") {
                return Ok(Vec::new());
            }
            anyhow::bail!("tmux list-panes failed: {}", stderr);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().filter_map(parse_pane_line).collect())
    }

    /// Environment of a tmux session, as new panes in it inherit it
    pub async fn session_env(&self, session_name: &str) -> Result<HashMap<String, String>> {
        let output = Command::new(&self.tmux_path)
            .args(["show-environment", "-t", session_name])
            .output()
            .await
            .context("Failed to execute tmux show-environment")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("tmux show-environment failed: {}", stderr);
        }

        Ok(parse_environment(&String::from_utf8_lossy(&output.stdout)))
    }

    /// The pane the user is looking at: `$TMUX_PANE` when running inside
    /// tmux, else the active pane of the first attached session
    pub async fn active_pane(&self) -> Result<Option<TmuxPane>> {
        let panes = self.list_panes().await?;
        if let Ok(current) = std::env::var("TMUX_PANE") {
            return Ok(panes.into_iter().find(|p| p.id == current));
        }
        Ok(panes
            .into_iter()
            .find(|p| p.active && p.window_active && p.session_attached > 0))
    }
}

impl Default for TmuxClient {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_pane_line(line: &str) -> Option<TmuxPane> {
    let parts: Vec<&str> = line.splitn(7, '|').collect();
    if parts.len() < 7 {
        return None;
    }

    Some(TmuxPane {
        id: parts[0].to_string(),
        pid: parts[1].parse().ok()?,
        active: parts[2] == "1",
        window_active: parts[3] == "1",
        session_attached: parts[4].parse().unwrap_or(0),
        session_name: parts[5].to_string(),
        window_name: parts[6].to_string(),
    })
}

/// `KEY=value` lines; `-KEY` marks a variable removed from the session
fn parse_environment(output: &str) -> HashMap<String, String> {
    output
        .lines()
        .filter(|line| !line.starts_with('-'))
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
