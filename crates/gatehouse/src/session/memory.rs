// ============================
// crates/gatehouse/src/session/memory.rs
// ============================
//! Cookie-keyed in-memory session storage.
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{SessionError, SessionStore, SessionValue};

/// Name of the cookie carrying the session reference.
pub const SESSION_COOKIE: &str = "gatehouse-session";

/// One caller's session values.
#[derive(Debug, Default)]
pub struct MemorySession {
    values: RwLock<HashMap<String, SessionValue>>,
}

#[async_trait]
impl SessionStore for MemorySession {
    async fn get_value(&self, key: &str) -> Result<SessionValue, SessionError> {
        let values = self.values.read().await;
        values.get(key).cloned().ok_or(SessionError::NoSuchValue)
    }

    async fn set_value(&self, key: &str, value: SessionValue) -> Result<(), SessionError> {
        let mut values = self.values.write().await;
        values.insert(key.to_string(), value);
        Ok(())
    }
}

/// Session broker that keeps every session in process memory, keyed by an
/// opaque cookie value. Sessions are lost on restart and never expire, so
/// like the in-memory credential store this is test and demo grade only.
#[derive(Clone, Debug, Default)]
pub struct MemorySessions {
    sessions: Arc<DashMap<String, Arc<MemorySession>>>,
}

impl MemorySessions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a presented session reference, or mint a fresh session.
    ///
    /// Returns the session handle plus, when a new session was created
    /// (no reference presented, or an unrecognized one), the reference the
    /// caller must be handed back via `Set-Cookie`.
    pub fn acquire(&self, presented: Option<&str>) -> (Arc<MemorySession>, Option<String>) {
        if let Some(reference) = presented {
            if let Some(existing) = self.sessions.get(reference) {
                return (existing.value().clone(), None);
            }
        }

        let reference = Uuid::new_v4().to_string();
        let session = Arc::new(MemorySession::default());
        self.sessions.insert(reference.clone(), session.clone());
        (session, Some(reference))
    }

    /// Number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
