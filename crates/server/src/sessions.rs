//! In-memory table of active upload sessions.
//!
//! Each session lives behind its own mutex so concurrent chunk writes to
//! different sessions never contend, while writes to the same session
//! serialize. The outer map lock is held only for lookups and membership
//! changes, never across chunk I/O.

use std::collections::HashMap;
use std::sync::Arc;

use clipdock_core::{SessionId, UploadSession};
use tokio::sync::{Mutex, RwLock};

pub type SharedSession = Arc<Mutex<UploadSession>>;

#[derive(Default)]
pub struct SessionTable {
    sessions: RwLock<HashMap<SessionId, SharedSession>>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, session: UploadSession) -> SharedSession {
        let id = session.id;
        let shared = Arc::new(Mutex::new(session));
        self.sessions.write().await.insert(id, shared.clone());
        shared
    }

    pub async fn get(&self, id: &SessionId) -> Option<SharedSession> {
        self.sessions.read().await.get(id).cloned()
    }

    pub async fn remove(&self, id: &SessionId) -> Option<SharedSession> {
        self.sessions.write().await.remove(id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Snapshot of current session ids, for the reaper sweep.
    pub async fn ids(&self) -> Vec<SessionId> {
        self.sessions.read().await.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(filename: &str) -> UploadSession {
        UploadSession::new(filename.to_string(), 10_000_000, 2, 5_000_000)
    }

    #[tokio::test]
    async fn insert_get_remove() {
        let table = SessionTable::new();
        let shared = table.insert(session("a.mp4")).await;
        let id = shared.lock().await.id;

        assert!(table.get(&id).await.is_some());
        assert_eq!(table.len().await, 1);

        table.remove(&id).await;
        assert!(table.get(&id).await.is_none());
        assert_eq!(table.len().await, 0);
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let table = SessionTable::new();
        let shared = table.insert(session("a.mp4")).await;
        let id = shared.lock().await.id;

        assert!(table.remove(&id).await.is_some());
        assert!(table.remove(&id).await.is_none());
    }

    #[tokio::test]
    async fn ids_snapshots_membership() {
        let table = SessionTable::new();
        table.insert(session("a.mp4")).await;
        table.insert(session("b.mp4")).await;
        assert_eq!(table.ids().await.len(), 2);
    }
}
