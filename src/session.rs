//! Session state layer
//!
//! Holds per-session conversation state for the lifetime of the active
//! session. In-memory only; state is created empty at session start and
//! discarded at session end.
//!
//! Each session hands out an `Arc<Mutex<ConversationState>>`. The
//! orchestrator holds the lock for a full turn, so a new user message is
//! never processed while a previous transition is still running.

use crate::models::ConversationState;
use crate::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

pub type SessionHandle = Arc<Mutex<ConversationState>>;

/// Trait for session state storage
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch the session, creating a fresh empty one on first contact.
    /// The boolean is true when the session was just created.
    async fn get_or_create(&self, session_id: Uuid) -> Result<(SessionHandle, bool)>;

    /// Tear down a session, discarding its state.
    async fn remove(&self, session_id: Uuid) -> Result<()>;

    async fn session_count(&self) -> usize;
}

/// In-memory session store
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, SessionHandle>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get_or_create(&self, session_id: Uuid) -> Result<(SessionHandle, bool)> {
        {
            let sessions = self.sessions.read().await;
            if let Some(handle) = sessions.get(&session_id) {
                return Ok((handle.clone(), false));
            }
        }

        let mut sessions = self.sessions.write().await;
        // Re-check under the write lock; another turn may have created it.
        if let Some(handle) = sessions.get(&session_id) {
            return Ok((handle.clone(), false));
        }

        let handle = Arc::new(Mutex::new(ConversationState::new(session_id)));
        sessions.insert(session_id, handle.clone());
        Ok((handle, true))
    }

    async fn remove(&self, session_id: Uuid) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(&session_id);
        Ok(())
    }

    async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Phase;

    #[tokio::test]
    async fn test_get_or_create_is_stable() {
        let store = InMemorySessionStore::new();
        let id = Uuid::new_v4();

        let (handle, created) = store.get_or_create(id).await.unwrap();
        assert!(created);
        {
            let mut state = handle.lock().await;
            state.profile.name = Some("Acme".into());
        }

        let (handle, created) = store.get_or_create(id).await.unwrap();
        assert!(!created);
        let state = handle.lock().await;
        assert_eq!(state.profile.name.as_deref(), Some("Acme"));
        assert_eq!(state.phase, Phase::Gathering);
    }

    #[tokio::test]
    async fn test_remove_discards_state() {
        let store = InMemorySessionStore::new();
        let id = Uuid::new_v4();

        store.get_or_create(id).await.unwrap();
        assert_eq!(store.session_count().await, 1);

        store.remove(id).await.unwrap();
        assert_eq!(store.session_count().await, 0);

        let (_, created) = store.get_or_create(id).await.unwrap();
        assert!(created);
    }
}
