//! In-memory session registry

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use super::Session;

/// Shared, lockable session
pub type SessionHandle = Arc<Mutex<Session>>;

/// Sessions keyed by id, dropped after a period of inactivity
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, SessionHandle>>>,
    ttl: Duration,
}

impl SessionStore {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Create a fresh session, sweeping expired ones first
    pub async fn create(&self) -> (Uuid, SessionHandle) {
        let swept = self.sweep_expired().await;
        if swept > 0 {
            tracing::debug!(count = swept, "expired idle sessions");
        }

        let id = Uuid::new_v4();
        let handle = Arc::new(Mutex::new(Session::new(id)));
        self.sessions.write().await.insert(id, Arc::clone(&handle));
        tracing::info!(session = %id, "session created");
        (id, handle)
    }

    pub async fn get(&self, id: Uuid) -> Option<SessionHandle> {
        self.sessions.read().await.get(&id).cloned()
    }

    /// Remove a session; returns whether it existed
    pub async fn remove(&self, id: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        if removed {
            tracing::info!(session = %id, "session removed");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Drop sessions idle for longer than the TTL
    ///
    /// Sessions whose lock is held are in use and never swept.
    pub async fn sweep_expired(&self) -> usize {
        let Ok(ttl) = chrono::Duration::from_std(self.ttl) else {
            return 0;
        };
        let cutoff = Utc::now() - ttl;

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, handle| {
            handle
                .try_lock()
                .map_or(true, |session| session.last_active() >= cutoff)
        });
        before - sessions.len()
    }
}
