//! tmux as a terminal host: panes are terminals, their window name is the
//! terminal name and the owning session's environment is the creation env.

mod client;

pub use client::TmuxClient;

use anyhow::Result;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use crate::actions::HostEvent;
use crate::terminal::{CreationMetadata, SessionId, Terminal};

/// One pane as reported by `tmux list-panes`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TmuxPane {
    /// Pane ID (e.g., "%3"), never reused by a tmux server
    pub id: String,
    pub pid: u32,
    pub active: bool,
    pub window_active: bool,
    pub session_attached: usize,
    pub session_name: String,
    pub window_name: String,
}

impl TmuxPane {
    pub fn session_id(&self) -> Option<SessionId> {
        self.id
            .strip_prefix('%')
            .and_then(|n| n.parse().ok())
            .map(SessionId::from_raw)
    }

    pub fn into_terminal(self, env: Option<HashMap<String, String>>) -> Option<Terminal> {
        let id = self.session_id()?;
        let creation = env.map(|env| CreationMetadata {
            name: None,
            env: Some(env),
        });
        Some(Terminal::spawned(id, self.window_name, creation, self.pid))
    }
}

/// Turns successive pane listings into terminal lifecycle events
#[derive(Default)]
pub struct PaneWatcher {
    client: TmuxClient,
    known: HashMap<SessionId, Terminal>,
}

impl PaneWatcher {
    pub fn new(client: TmuxClient) -> Self {
        Self {
            client,
            known: HashMap::new(),
        }
    }

    /// Terminals open right now. Seeds the watcher without emitting events.
    pub async fn snapshot(&mut self) -> Result<Vec<Terminal>> {
        let panes = self.client.list_panes().await?;
        let envs = self.fetch_envs(&panes).await;
        self.apply(panes, &envs);
        Ok(self.known.values().cloned().collect())
    }

    /// List panes again and report what opened and closed since the last call
    pub async fn poll(&mut self) -> Result<Vec<HostEvent>> {
        let panes = self.client.list_panes().await?;
        let envs = self.fetch_envs(&panes).await;
        Ok(self.apply(panes, &envs))
    }

    /// Read the environment of every session that owns a pane not seen yet
    async fn fetch_envs(&self, panes: &[TmuxPane]) -> HashMap<String, HashMap<String, String>> {
        let sessions: HashSet<&str> = panes
            .iter()
            .filter(|p| p.session_id().is_some_and(|id| !self.known.contains_key(&id)))
            .map(|p| p.session_name.as_str())
            .collect();

        let mut envs = HashMap::new();
        for session in sessions {
            match self.client.session_env(session).await {
                Ok(env) => {
                    envs.insert(session.to_string(), env);
                }
                Err(e) => warn!(session, error = %e, "failed to read session environment"),
            }
        }
        envs
    }

    /// Reconcile the known terminals with a fresh listing. Known terminals
    /// are renamed in place so delayed classification sees the latest name.
    fn apply(
        &mut self,
        panes: Vec<TmuxPane>,
        envs: &HashMap<String, HashMap<String, String>>,
    ) -> Vec<HostEvent> {
        let mut events = Vec::new();
        let mut seen = HashSet::new();

        for pane in panes {
            let Some(id) = pane.session_id() else {
                continue;
            };
            seen.insert(id);

            if let Some(terminal) = self.known.get(&id) {
                if terminal.name() != pane.window_name {
                    debug!(session = %id, name = %pane.window_name, "pane renamed");
                    terminal.set_name(pane.window_name);
                }
                continue;
            }

            let env = envs.get(&pane.session_name).cloned();
            if let Some(terminal) = pane.into_terminal(env) {
                self.known.insert(id, terminal.clone());
                events.push(HostEvent::SessionOpened(terminal));
            }
        }

        let closed: Vec<SessionId> = self
            .known
            .keys()
            .filter(|id| !seen.contains(id))
            .copied()
            .collect();
        for id in closed {
            if let Some(terminal) = self.known.remove(&id) {
                events.push(HostEvent::SessionClosed(terminal));
            }
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pane(id: &str, pid: u32, window: &str) -> TmuxPane {
        TmuxPane {
            id: id.to_string(),
            pid,
            active: false,
            window_active: false,
            session_attached: 0,
            session_name: "main".to_string(),
            window_name: window.to_string(),
        }
    }

    #[test]
    fn test_session_id_from_pane_id() {
        assert_eq!(
            pane("%7", 1, "zsh").session_id(),
            Some(SessionId::from_raw(7))
        );
        assert_eq!(pane("bogus", 1, "zsh").session_id(), None);
    }

    #[tokio::test]
    async fn test_apply_reports_opened_and_closed() {
        let mut watcher = PaneWatcher::default();
        let envs = HashMap::new();

        let events = watcher.apply(vec![pane("%1", 100, "zsh"), pane("%2", 200, "copilot")], &envs);
        assert_eq!(events.len(), 2);
        assert!(events
            .iter()
            .all(|e| matches!(e, HostEvent::SessionOpened(_))));

        let events = watcher.apply(vec![pane("%2", 200, "copilot"), pane("%3", 300, "agent")], &envs);
        assert_eq!(events.len(), 2);
        let opened: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                HostEvent::SessionOpened(t) => Some(t.name()),
                _ => None,
            })
            .collect();
        let closed: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                HostEvent::SessionClosed(t) => Some(t.id()),
                _ => None,
            })
            .collect();
        assert_eq!(opened, vec!["agent"]);
        assert_eq!(closed, vec![SessionId::from_raw(1)]);
    }

    #[tokio::test]
    async fn test_apply_renames_known_terminal() {
        let mut watcher = PaneWatcher::default();
        let envs = HashMap::new();

        let events = watcher.apply(vec![pane("%4", 400, "node")], &envs);
        let HostEvent::SessionOpened(terminal) = &events[0] else {
            panic!("expected open event");
        };

        let events = watcher.apply(vec![pane("%4", 400, "copilot agent")], &envs);
        assert!(events.is_empty());
        assert_eq!(terminal.name(), "copilot agent");
    }

    #[tokio::test]
    async fn test_apply_attaches_session_env() {
        let mut watcher = PaneWatcher::default();
        let mut envs = HashMap::new();
        envs.insert(
            "main".to_string(),
            HashMap::from([("COPILOT_AGENT".to_string(), "1".to_string())]),
        );

        let events = watcher.apply(vec![pane("%5", 500, "Terminal 1")], &envs);
        let HostEvent::SessionOpened(terminal) = &events[0] else {
            panic!("expected open event");
        };
        let env = terminal.creation_metadata().and_then(|m| m.env.as_ref()).unwrap();
        assert_eq!(env.get("COPILOT_AGENT").map(String::as_str), Some("1"));
        assert_eq!(terminal.try_process_id(), Some(500));
    }
}
