use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::actions::HostEvent;
use crate::config::Config;
use crate::marker::{MarkerRecord, MarkerStore};
use crate::registry::SessionRegistry;
use crate::terminal::{Terminal, TerminalClassifier};

/// Time given to a freshly opened terminal to settle its name and process id
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(200);

/// Wires host lifecycle events to the classifier, registry and marker store.
///
/// Handlers never fail: store errors are logged and dropped. Work scheduled
/// for a terminal is never cancelled, so a terminal closed during its settling
/// delay can still end up marked until the next sweep.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    classifier: TerminalClassifier,
    store: MarkerStore,
    registry: Mutex<SessionRegistry>,
    settle_delay: Duration,
}

impl Orchestrator {
    pub fn new(classifier: TerminalClassifier, store: MarkerStore, settle_delay: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                classifier,
                store,
                registry: Mutex::new(SessionRegistry::new()),
                settle_delay,
            }),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            TerminalClassifier::new(config.patterns.clone()),
            MarkerStore::new(config.marker_dir(), config.marker_prefix.clone()),
            config.settle_delay(),
        )
    }

    pub fn classifier(&self) -> &TerminalClassifier {
        &self.inner.classifier
    }

    pub fn store(&self) -> &MarkerStore {
        &self.inner.store
    }

    pub fn is_tracked(&self, terminal: &Terminal) -> bool {
        self.registry().has(terminal.id())
    }

    /// Purge markers left by earlier runs, then adopt the terminals that were
    /// already open. Must run before any event is handled.
    pub async fn startup<I>(&self, existing: I) -> Vec<JoinHandle<()>>
    where
        I: IntoIterator<Item = Terminal>,
    {
        self.sweep().await;
        existing
            .into_iter()
            .filter_map(|terminal| {
                debug!(name = %terminal.name(), "checking existing terminal");
                self.on_existing(terminal)
            })
            .collect()
    }

    /// Graceful-exit cleanup
    pub async fn shutdown(&self) -> usize {
        info!("shutting down, removing agent markers");
        self.sweep().await
    }

    /// Remove every marker in the store, logging failures
    pub async fn sweep(&self) -> usize {
        match self.inner.store.remove_all().await {
            Ok(removed) => removed,
            Err(e) => {
                warn!(error = %e, "failed to clean up agent markers");
                0
            }
        }
    }

    /// Dispatch one host event. Returns true when the host asked to stop.
    pub fn handle_event(&self, event: HostEvent) -> bool {
        match event {
            HostEvent::SessionOpened(terminal) => {
                self.on_opened(terminal);
                false
            }
            HostEvent::SessionClosed(terminal) => {
                self.on_closed(terminal);
                false
            }
            HostEvent::Error(msg) => {
                warn!(error = %msg, "host error");
                false
            }
            HostEvent::Shutdown => true,
        }
    }

    /// Classify the terminal once the settling delay has elapsed
    pub fn on_opened(&self, terminal: Terminal) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(this.inner.settle_delay).await;
            debug!(name = %terminal.name(), "processing opened terminal");
            if this.classify_and_register(&terminal) {
                this.write_marker(&terminal).await;
            }
        })
    }

    /// Classify an already initialized terminal right away. The marker write
    /// still waits for the process id; its task handle is returned for agents.
    pub fn on_existing(&self, terminal: Terminal) -> Option<JoinHandle<()>> {
        if !self.classify_and_register(&terminal) {
            return None;
        }
        let this = self.clone();
        Some(tokio::spawn(async move {
            this.write_marker(&terminal).await;
        }))
    }

    /// Drop a tracked terminal and its marker. Untracked terminals are ignored.
    pub fn on_closed(&self, terminal: Terminal) -> Option<JoinHandle<()>> {
        if !self.registry().remove(terminal.id()) {
            return None;
        }
        info!(name = %terminal.name(), session = %terminal.id(), "agent terminal closed");

        let this = self.clone();
        Some(tokio::spawn(async move {
            let Some(pid) = terminal.process_id().await else {
                warn!(name = %terminal.name(), "process id never resolved, marker not removed");
                return;
            };
            if let Err(e) = this.inner.store.remove(pid).await {
                warn!(pid, error = %e, "failed to remove agent marker");
            }
        }))
    }

    /// Run the classifier and record an agent verdict in the registry
    pub fn classify_and_register(&self, terminal: &Terminal) -> bool {
        let is_agent = self.inner.classifier.classify_terminal(terminal);
        if is_agent {
            self.registry().add(terminal.id());
            info!(name = %terminal.name(), session = %terminal.id(), "agent terminal detected");
        } else {
            debug!(name = %terminal.name(), "standard terminal");
        }
        is_agent
    }

    /// Write the terminal's marker once its process id resolves. Skipped if
    /// it never does.
    pub async fn write_marker(&self, terminal: &Terminal) {
        let Some(pid) = terminal.process_id().await else {
            warn!(name = %terminal.name(), "process id not available, marker not created");
            return;
        };
        let record = MarkerRecord::new(pid, terminal.name());
        if let Err(e) = self.inner.store.write(&record).await {
            warn!(pid, error = %e, "failed to create agent marker");
        }
    }

    fn registry(&self) -> std::sync::MutexGuard<'_, SessionRegistry> {
        self.inner
            .registry
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marker::DEFAULT_MARKER_PREFIX;
    use crate::terminal::SessionId;
    use tempfile::TempDir;

    fn orchestrator(dir: &TempDir) -> Orchestrator {
        Orchestrator::new(
            TerminalClassifier::default(),
            MarkerStore::new(dir.path(), DEFAULT_MARKER_PREFIX),
            Duration::from_millis(10),
        )
    }

    #[tokio::test]
    async fn test_handle_event_stops_on_shutdown() {
        let dir = TempDir::new().unwrap();
        let orch = orchestrator(&dir);
        assert!(!orch.handle_event(HostEvent::Error("tmux gone".to_string())));
        assert!(orch.handle_event(HostEvent::Shutdown));
    }

    #[tokio::test]
    async fn test_close_of_untracked_terminal_is_ignored() {
        let dir = TempDir::new().unwrap();
        let orch = orchestrator(&dir);
        let terminal = Terminal::spawned(SessionId::next(), "zsh", None, 1);
        assert!(orch.on_closed(terminal).is_none());
    }

    #[tokio::test]
    async fn test_registry_tracks_agent_until_close() {
        let dir = TempDir::new().unwrap();
        let orch = orchestrator(&dir);
        let terminal = Terminal::spawned(SessionId::next(), "Copilot", None, 31);

        orch.on_opened(terminal.clone()).await.unwrap();
        assert!(orch.is_tracked(&terminal));

        orch.on_closed(terminal.clone()).unwrap().await.unwrap();
        assert!(!orch.is_tracked(&terminal));
    }
}
