//! In-memory session store
//!
//! The store owns its synchronization and is shared via `Arc`; the webhook
//! handler and the action dispatcher both hold clones. A secondary
//! user-id index backs the user lookup so first-contact detection is a map
//! hit, not a scan.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::outbound::UserProfile;
use crate::session::types::{ConversationState, Session};

#[derive(Debug, Default)]
struct SessionMap {
    /// Primary index: session id -> session
    sessions: HashMap<String, Session>,
    /// Secondary index: user id -> session id
    by_user: HashMap<String, String>,
}

/// In-memory store for conversation sessions
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    inner: Arc<RwLock<SessionMap>>,
}

impl InMemorySessionStore {
    /// Create a new session store
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(SessionMap::default())),
        }
    }

    /// Look up the session id for a user, if one exists
    pub async fn find_by_user(&self, user_id: &str) -> Option<String> {
        let map = self.inner.read().await;
        map.by_user.get(user_id).cloned()
    }

    /// Return the existing session for a user, or create a fresh one.
    ///
    /// At most one session exists per user id; calling this twice without
    /// an intervening delete returns the same session.
    pub async fn find_or_create(&self, user_id: &str) -> Session {
        let map = self.inner.read().await;
        if let Some(id) = map.by_user.get(user_id) {
            if let Some(session) = map.sessions.get(id) {
                return session.clone();
            }
        }
        drop(map);

        let mut map = self.inner.write().await;
        // Re-check under the write lock: another handler may have created
        // the session between the two lock acquisitions.
        if let Some(id) = map.by_user.get(user_id) {
            if let Some(session) = map.sessions.get(id) {
                return session.clone();
            }
        }

        let session = Session::new(user_id);
        debug!("Created session {} for user {}", session.id, user_id);
        map.by_user
            .insert(user_id.to_string(), session.id.clone());
        map.sessions.insert(session.id.clone(), session.clone());
        session
    }

    /// Read a session's conversation state
    pub async fn context(&self, session_id: &str) -> Option<ConversationState> {
        let map = self.inner.read().await;
        map.sessions.get(session_id).map(|s| s.context.clone())
    }

    /// Replace a session's conversation state
    pub async fn set_context(&self, session_id: &str, context: ConversationState) {
        let mut map = self.inner.write().await;
        if let Some(session) = map.sessions.get_mut(session_id) {
            session.context = context;
            session.updated_at = chrono::Utc::now();
        }
    }

    /// Attach a fetched profile to a session
    pub async fn set_profile(&self, session_id: &str, profile: UserProfile) {
        let mut map = self.inner.write().await;
        if let Some(session) = map.sessions.get_mut(session_id) {
            session.profile = Some(profile);
            session.updated_at = chrono::Utc::now();
        }
    }

    /// Resolve a session id back to its user id
    pub async fn user_for(&self, session_id: &str) -> Option<String> {
        let map = self.inner.read().await;
        map.sessions.get(session_id).map(|s| s.user_id.clone())
    }

    /// Remove a session and its user index entry
    pub async fn delete(&self, session_id: &str) {
        let mut map = self.inner.write().await;
        if let Some(session) = map.sessions.remove(session_id) {
            map.by_user.remove(&session.user_id);
        }
    }

    /// Number of live sessions
    pub async fn len(&self) -> usize {
        let map = self.inner.read().await;
        map.sessions.len()
    }

    /// Whether the store holds no sessions
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Clone for InMemorySessionStore {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
