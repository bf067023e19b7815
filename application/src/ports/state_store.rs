//! Local session state port
//!
//! A small key-value store that keeps the latest phase snapshot per session
//! so an app restart resumes the countdown where it stopped. Writes are
//! fire-and-forget overwrites: callers log failures and carry on.

use huddle_domain::{PersistedPhase, SessionId};
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;

/// Errors from the local state store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Corrupt state for {key}: {message}")]
    Corrupt { key: String, message: String },
}

/// Persisted per-session phase snapshots
pub trait SessionStateStore: Send + Sync {
    /// Latest snapshot for `session`, if any
    fn load(&self, session: &SessionId) -> Result<Option<PersistedPhase>, StoreError>;

    /// Overwrite the snapshot for `session`
    fn save(&self, session: &SessionId, snapshot: &PersistedPhase) -> Result<(), StoreError>;

    /// Forget everything stored for `session`
    fn clear(&self, session: &SessionId) -> Result<(), StoreError>;

    /// Session this client was last running
    fn active_session(&self) -> Result<Option<SessionId>, StoreError>;

    /// Mark `session` as the one this client is running
    fn set_active_session(&self, session: &SessionId) -> Result<(), StoreError>;
}

/// In-memory store for tests and `--ephemeral` runs
#[derive(Default)]
pub struct MemoryStateStore {
    snapshots: Mutex<HashMap<SessionId, PersistedPhase>>,
    active: Mutex<Option<SessionId>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStateStore for MemoryStateStore {
    fn load(&self, session: &SessionId) -> Result<Option<PersistedPhase>, StoreError> {
        let snapshots = self.snapshots.lock().map_err(|e| StoreError::Io(e.to_string()))?;
        Ok(snapshots.get(session).copied())
    }

    fn save(&self, session: &SessionId, snapshot: &PersistedPhase) -> Result<(), StoreError> {
        let mut snapshots = self.snapshots.lock().map_err(|e| StoreError::Io(e.to_string()))?;
        snapshots.insert(session.clone(), *snapshot);
        Ok(())
    }

    fn clear(&self, session: &SessionId) -> Result<(), StoreError> {
        let mut snapshots = self.snapshots.lock().map_err(|e| StoreError::Io(e.to_string()))?;
        snapshots.remove(session);
        Ok(())
    }

    fn active_session(&self) -> Result<Option<SessionId>, StoreError> {
        let active = self.active.lock().map_err(|e| StoreError::Io(e.to_string()))?;
        Ok(active.clone())
    }

    fn set_active_session(&self, session: &SessionId) -> Result<(), StoreError> {
        let mut active = self.active.lock().map_err(|e| StoreError::Io(e.to_string()))?;
        *active = Some(session.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use huddle_domain::Phase;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStateStore::new();
        let session = SessionId::new("sess1").unwrap();
        assert_eq!(store.load(&session).unwrap(), None);

        store
            .save(&session, &PersistedPhase::new(Phase::Discussion, 42))
            .unwrap();
        assert_eq!(
            store.load(&session).unwrap(),
            Some(PersistedPhase::new(Phase::Discussion, 42))
        );

        store.clear(&session).unwrap();
        assert_eq!(store.load(&session).unwrap(), None);
    }

    #[test]
    fn test_memory_store_active_session() {
        let store = MemoryStateStore::new();
        assert_eq!(store.active_session().unwrap(), None);
        let session = SessionId::new("sess1").unwrap();
        store.set_active_session(&session).unwrap();
        assert_eq!(store.active_session().unwrap(), Some(session));
    }
}
