mod heuristics;

pub use heuristics::{
    ClassificationPatterns, TerminalClassifier, AGENT_ENV_FLAGS, AGENT_PATTERNS, SHELL_EXCLUSIONS,
};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::watch;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque handle of one open terminal instance. Never reused within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(u64);

impl SessionId {
    /// Allocate a fresh process-unique id
    pub fn next() -> Self {
        Self(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Wrap an id the host already guarantees to be unique (e.g. a tmux pane number)
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Options the host recorded when it created the terminal
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreationMetadata {
    /// Name override requested at creation time
    pub name: Option<String>,
    /// Environment variables the terminal was created with
    pub env: Option<HashMap<String, String>>,
}

impl CreationMetadata {
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            env: None,
        }
    }

    pub fn with_env<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            name: None,
            env: Some(
                vars.into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }
}

/// A terminal session owned by the host.
///
/// Cloning is cheap and every clone observes the same name and process id.
/// The creation metadata is fixed for the lifetime of the session.
#[derive(Debug, Clone)]
pub struct Terminal {
    id: SessionId,
    name: Arc<RwLock<String>>,
    creation: Option<Arc<CreationMetadata>>,
    pid: watch::Receiver<Option<u32>>,
}

/// Host side of a terminal's process id. Dropping it without resolving means
/// the process never started.
#[derive(Debug)]
pub struct ProcessIdSender(watch::Sender<Option<u32>>);

impl ProcessIdSender {
    pub fn resolve(&self, pid: u32) {
        self.0.send_replace(Some(pid));
    }
}

impl Terminal {
    /// Create a terminal whose process id is resolved later through the returned sender
    pub fn new(
        id: SessionId,
        name: impl Into<String>,
        creation: Option<CreationMetadata>,
    ) -> (Self, ProcessIdSender) {
        let (tx, rx) = watch::channel(None);
        let terminal = Self {
            id,
            name: Arc::new(RwLock::new(name.into())),
            creation: creation.map(Arc::new),
            pid: rx,
        };
        (terminal, ProcessIdSender(tx))
    }

    /// Create a terminal whose process is already running
    pub fn spawned(
        id: SessionId,
        name: impl Into<String>,
        creation: Option<CreationMetadata>,
        pid: u32,
    ) -> Self {
        let (terminal, sender) = Self::new(id, name, creation);
        sender.resolve(pid);
        terminal
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Current display name
    pub fn name(&self) -> String {
        self.name
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Hosts rename terminals while they initialize
    pub fn set_name(&self, name: impl Into<String>) {
        *self.name.write().unwrap_or_else(|e| e.into_inner()) = name.into();
    }

    pub fn creation_metadata(&self) -> Option<&CreationMetadata> {
        self.creation.as_deref()
    }

    /// Process id if it has already resolved
    pub fn try_process_id(&self) -> Option<u32> {
        *self.pid.borrow()
    }

    /// Wait for the process id.
    ///
    /// There is no timeout: while the host keeps the sender alive without
    /// resolving, this never completes. Returns `None` once the sender is
    /// dropped unresolved.
    pub async fn process_id(&self) -> Option<u32> {
        let mut rx = self.pid.clone();
        rx.wait_for(Option::is_some).await.ok().and_then(|pid| *pid)
    }
}
