//! In-memory keyed session store.
//!
//! Each session lives behind its own `tokio::sync::Mutex`, and an
//! orchestrator operation holds that lock for its whole
//! read-compute-swap critical section, including generation awaits. The
//! registry map itself is guarded by a `RwLock` that is only held for
//! lookup and insert, never across an await, so sessions never block each
//! other. Nothing is persisted: a process restart discards all sessions.

use crate::error::SessionError;
use crate::session::SessionState;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// Handle to one stored session. The driver locks it, works on a scratch
/// clone, and writes the successor state back through the same guard.
pub type SessionSlot = Arc<Mutex<SessionState>>;

/// Registry of all live and ended sessions, keyed by session id.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<Uuid, SessionSlot>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a session under a fresh id and returns the id.
    pub async fn insert(&self, state: SessionState) -> Uuid {
        let id = Uuid::new_v4();
        self.inner
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(state)));
        id
    }

    /// Looks up a session slot, failing with `NoActiveSession` for unknown
    /// ids.
    pub async fn get(&self, id: Uuid) -> Result<SessionSlot, SessionError> {
        self.inner
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(SessionError::NoActiveSession(id))
    }

    /// Number of sessions currently registered, ended ones included.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::PatientProfile;

    fn state() -> SessionState {
        SessionState::new(PatientProfile::new(
            40,
            vec!["panic attacks".to_string()],
            "restless".to_string(),
            "hurried".to_string(),
        ))
    }

    #[tokio::test]
    async fn insert_assigns_distinct_ids() {
        let store = SessionStore::new();
        let a = store.insert(state()).await;
        let b = store.insert(state()).await;
        assert_ne!(a, b);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn get_unknown_id_is_no_active_session() {
        let store = SessionStore::new();
        let missing = Uuid::new_v4();
        match store.get(missing).await {
            Err(SessionError::NoActiveSession(id)) => assert_eq!(id, missing),
            other => panic!("expected NoActiveSession, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn sessions_are_mutated_independently() {
        let store = SessionStore::new();
        let a = store.insert(state()).await;
        let b = store.insert(state()).await;

        {
            let slot = store.get(a).await.unwrap();
            let mut guard = slot.lock().await;
            guard.active = false;
        }

        let slot_b = store.get(b).await.unwrap();
        assert!(slot_b.lock().await.active);
    }
}
