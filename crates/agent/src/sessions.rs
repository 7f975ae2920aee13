use std::collections::HashMap;
use std::sync::Arc;

use securebank_core::audit::{AuditSink, NoopAuditSink};
use securebank_core::config::SessionConfig;
use securebank_core::{Message, Transcript};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::info;
use uuid::Uuid;

use crate::backend::BankBackend;
use crate::runtime::{BusyFlag, ConversationController};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("session limit of {max} reached")]
    Capacity { max: usize },
    #[error("session `{0}` not found")]
    NotFound(SessionId),
}

struct SessionEntry<B: ?Sized> {
    controller: Mutex<ConversationController<B>>,
    busy: BusyFlag,
}

/// Registry of independent conversations sharing one backend. Each session
/// is serialized behind its own mutex; different sessions run concurrently.
pub struct SessionManager<B: ?Sized> {
    backend: Arc<B>,
    config: SessionConfig,
    audit: Arc<dyn AuditSink>,
    sessions: RwLock<HashMap<SessionId, Arc<SessionEntry<B>>>>,
}

impl<B> SessionManager<B>
where
    B: BankBackend + ?Sized,
{
    pub fn new(backend: Arc<B>, config: SessionConfig) -> Self {
        Self { backend, config, audit: Arc::new(NoopAuditSink), sessions: RwLock::new(HashMap::new()) }
    }

    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = sink;
        self
    }

    /// Opens a new session and returns its id along with the greeting, if any.
    pub async fn open(&self) -> Result<(SessionId, Vec<Message>), SessionError> {
        let mut sessions = self.sessions.write().await;
        if sessions.len() >= self.config.max_sessions {
            return Err(SessionError::Capacity { max: self.config.max_sessions });
        }

        let id = SessionId::new();
        let controller = ConversationController::from_config(Arc::clone(&self.backend), &self.config)
            .with_session_id(id.as_str())
            .with_audit_sink(Arc::clone(&self.audit));
        let greeting = controller.transcript().messages().to_vec();
        let busy = controller.busy_flag();
        sessions.insert(id.clone(), Arc::new(SessionEntry { controller: Mutex::new(controller), busy }));

        info!(
            event_name = "session.opened",
            session_id = %id,
            open_sessions = sessions.len(),
            "session opened"
        );
        Ok((id, greeting))
    }

    /// Runs one turn on `id`. Turns for the same session queue behind each other.
    pub async fn submit(&self, id: &SessionId, text: &str) -> Result<Vec<Message>, SessionError> {
        let entry = self.entry(id).await?;
        let mut controller = entry.controller.lock().await;
        Ok(controller.submit(text).await)
    }

    pub async fn transcript(&self, id: &SessionId) -> Result<Transcript, SessionError> {
        let entry = self.entry(id).await?;
        let controller = entry.controller.lock().await;
        Ok(controller.transcript().clone())
    }

    /// Does not wait for an in-flight turn.
    pub async fn is_busy(&self, id: &SessionId) -> Result<bool, SessionError> {
        Ok(self.entry(id).await?.busy.is_busy())
    }

    pub async fn close(&self, id: &SessionId) -> Result<(), SessionError> {
        let removed = self.sessions.write().await.remove(id);
        match removed {
            Some(_) => {
                info!(event_name = "session.closed", session_id = %id, "session closed");
                Ok(())
            }
            None => Err(SessionError::NotFound(id.clone())),
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    async fn entry(&self, id: &SessionId) -> Result<Arc<SessionEntry<B>>, SessionError> {
        self.sessions.read().await.get(id).cloned().ok_or_else(|| SessionError::NotFound(id.clone()))
    }
}
