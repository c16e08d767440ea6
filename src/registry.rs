use std::collections::HashSet;

use crate::terminal::SessionId;

/// Sessions currently believed to be agent terminals.
///
/// Keyed by session identity, not name. Only consulted to decide whether a
/// close event needs marker cleanup; the marker directory is the source of truth.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    agents: HashSet<SessionId>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the session was already tracked
    pub fn add(&mut self, id: SessionId) -> bool {
        self.agents.insert(id)
    }

    /// Returns false if the session was not tracked
    pub fn remove(&mut self, id: SessionId) -> bool {
        self.agents.remove(&id)
    }

    pub fn has(&self, id: SessionId) -> bool {
        self.agents.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_remove_has() {
        let mut registry = SessionRegistry::new();
        let a = SessionId::next();
        let b = SessionId::next();

        assert!(registry.add(a));
        assert!(!registry.add(a));
        assert!(registry.has(a));
        assert!(!registry.has(b));
        assert_eq!(registry.len(), 1);

        assert!(registry.remove(a));
        assert!(!registry.remove(a));
        assert!(registry.is_empty());
    }
}
