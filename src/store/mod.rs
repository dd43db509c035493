//! Session Store (spec §4.1): the process-wide registry of active sessions.
//!
//! Exposed as a trait so a production deployment can swap in a different
//! backend without touching the Session Manager, mirroring the teacher's
//! `db::Pool` type-alias-for-swappable-backend pattern (generalized here to
//! a trait object since there is, by design, only one shipped implementation).
//!
//! Concurrency: a single top-level lock guards creation/lookup-by-id only.
//! Mutation of a session's own state never takes that lock — it is owned
//! exclusively by that session's actor task (`crate::manager`), which drains
//! its mailbox one command at a time. The top-level lock is therefore never
//! held across an `.await`.

use std::collections::HashMap;
use std::sync::RwLock;

use tokio::sync::mpsc;

use crate::manager::SessionCommand;
use crate::model::SessionId;

/// A handle to a live session actor: just its mailbox. Cloning a handle is
/// cheap (it's a channel sender) and safe to share across connection tasks.
#[derive(Clone)]
pub struct SessionHandle {
    pub session_id: SessionId,
    pub sender: mpsc::Sender<SessionCommand>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("unknown session")]
    UnknownSession,
    #[error("session already exists")]
    AlreadyExists,
}

/// Registry of live session actor handles (spec §4.1).
pub trait SessionStore: Send + Sync {
    fn register(&self, handle: SessionHandle) -> Result<(), StoreError>;
    fn get(&self, id: SessionId) -> Option<SessionHandle>;
    fn remove(&self, id: SessionId);
    fn list_active(&self) -> Vec<SessionHandle>;
}

/// Default, in-memory `SessionStore` (spec §4.1, §9 "process-wide
/// singleton"). No persistence across restarts by design (spec non-goal).
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn register(&self, handle: SessionHandle) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().expect("session store lock poisoned");
        if sessions.contains_key(&handle.session_id) {
            return Err(StoreError::AlreadyExists);
        }
        sessions.insert(handle.session_id, handle);
        Ok(())
    }

    fn get(&self, id: SessionId) -> Option<SessionHandle> {
        self.sessions
            .read()
            .expect("session store lock poisoned")
            .get(&id)
            .cloned()
    }

    fn remove(&self, id: SessionId) {
        self.sessions
            .write()
            .expect("session store lock poisoned")
            .remove(&id);
    }

    fn list_active(&self) -> Vec<SessionHandle> {
        self.sessions
            .read()
            .expect("session store lock poisoned")
            .values()
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(id: SessionId) -> SessionHandle {
        let (tx, _rx) = mpsc::channel(1);
        SessionHandle {
            session_id: id,
            sender: tx,
        }
    }

    #[test]
    fn register_then_get_round_trips() {
        let store = InMemorySessionStore::new();
        let id = SessionId::new();
        store.register(handle(id)).unwrap();
        assert!(store.get(id).is_some());
        assert_eq!(store.list_active().len(), 1);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let store = InMemorySessionStore::new();
        let id = SessionId::new();
        store.register(handle(id)).unwrap();
        assert_eq!(store.register(handle(id)).unwrap_err(), StoreError::AlreadyExists);
    }

    #[test]
    fn remove_drops_the_handle() {
        let store = InMemorySessionStore::new();
        let id = SessionId::new();
        store.register(handle(id)).unwrap();
        store.remove(id);
        assert!(store.get(id).is_none());
    }
}
