use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::progress::ProgressReporter;
use crate::session::Session;

/// A live session. The state lock is never held across extraction or the model call,
/// so progress can be read while work is running.
pub struct SessionEntry {
    pub session: Mutex<Session>,
    pub progress: ProgressReporter,
}

/// In-memory session registry. Nothing is written to disk.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, Arc<SessionEntry>>>>,
}

impl SessionStore {
    pub async fn create(&self) -> Arc<SessionEntry> {
        let session = Session::new();
        let id = session.id();
        let entry = Arc::new(SessionEntry {
            session: Mutex::new(session),
            progress: ProgressReporter::new(),
        });
        self.sessions.write().await.insert(id, entry.clone());
        info!("Session {id} created");
        entry
    }

    /// Looks up a session and marks it active.
    pub async fn get(&self, id: Uuid) -> Result<Arc<SessionEntry>, AppError> {
        let entry = self
            .sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))?;
        entry.session.lock().await.touch();
        Ok(entry)
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        if removed {
            info!("Session {id} discarded");
        }
        removed
    }

    /// Drops sessions idle for at least `ttl`. Sessions busy right now are kept.
    pub async fn sweep_idle(&self, ttl: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| match entry.session.try_lock() {
            Ok(session) => session.idle_for() < ttl,
            Err(_) => true,
        });
        let expired = before - sessions.len();
        if expired > 0 {
            info!("Expired {expired} idle session(s)");
        }
        expired
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
