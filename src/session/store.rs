//! Live browser sessions.

use dashmap::DashMap;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::queue::CommandQueue;
use crate::browser::{BrowserResult, BrowserSession};
use crate::commands::{CommandCatalog, CommandResult};
use crate::config::{QueueConfig, WaitConfig};
use crate::observability::metrics;

pub struct Session {
    id: String,
    browser: Arc<dyn BrowserSession>,
    capabilities: Value,
    queue: CommandQueue,
    created_at: Instant,
    created_unix: u64,
}

impl Session {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn browser(&self) -> &Arc<dyn BrowserSession> {
        &self.browser
    }

    pub fn capabilities(&self) -> &Value {
        &self.capabilities
    }

    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    pub async fn run(
        &self,
        catalog: &CommandCatalog,
        command: &str,
        args: Vec<String>,
        waits: WaitConfig,
    ) -> CommandResult {
        let started = Instant::now();
        let result = self
            .queue
            .execute(catalog, self.browser.clone(), command, args, waits)
            .await;
        tracing::debug!(
            session_id = %self.id,
            command,
            ok = result.is_ok(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Command finished"
        );
        result
    }

    pub fn interrupt(&self) -> bool {
        self.queue.interrupt()
    }

    /// Cancel outstanding work and close the browser.
    pub async fn close(&self) -> BrowserResult<()> {
        self.queue.shutdown();
        self.browser.close().await
    }

    pub fn describe(&self) -> Value {
        json!({
            "id": self.id,
            "capabilities": self.capabilities,
            "createdAt": self.created_unix,
            "ageSecs": self.created_at.elapsed().as_secs(),
            "busy": self.queue.is_busy(),
        })
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

/// Session registry keyed by session id.
#[derive(Debug)]
pub struct SessionStore {
    sessions: DashMap<String, Arc<Session>>,
    queue_config: QueueConfig,
    shutdown: CancellationToken,
}

impl SessionStore {
    /// Queues of every session are children of `shutdown`.
    pub fn new(queue_config: QueueConfig, shutdown: CancellationToken) -> Self {
        Self {
            sessions: DashMap::new(),
            queue_config,
            shutdown,
        }
    }

    pub fn create(&self, browser: Arc<dyn BrowserSession>, capabilities: Value) -> Arc<Session> {
        let session = Arc::new(Session {
            id: Uuid::new_v4().to_string(),
            browser,
            capabilities,
            queue: CommandQueue::with_parent(self.queue_config.clone(), &self.shutdown),
            created_at: Instant::now(),
            created_unix: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default(),
        });
        self.sessions.insert(session.id.clone(), session.clone());
        metrics::record_active_sessions(self.sessions.len());
        tracing::info!(session_id = %session.id, "Session created");
        session
    }

    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.get(id).map(|entry| entry.value().clone())
    }

    pub fn remove(&self, id: &str) -> Option<Arc<Session>> {
        let removed = self.sessions.remove(id).map(|(_, session)| session);
        if removed.is_some() {
            metrics::record_active_sessions(self.sessions.len());
            tracing::info!(session_id = %id, "Session removed");
        }
        removed
    }

    /// Sessions ordered by creation time.
    pub fn list(&self) -> Vec<Arc<Session>> {
        let mut sessions: Vec<_> = self.sessions.iter().map(|entry| entry.value().clone()).collect();
        sessions.sort_by_key(|s| s.created_at);
        sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Remove and close every session.
    pub async fn close_all(&self) {
        let ids: Vec<String> = self.sessions.iter().map(|entry| entry.key().clone()).collect();
        for id in ids {
            if let Some(session) = self.remove(&id) {
                if let Err(e) = session.close().await {
                    tracing::warn!(session_id = %id, error = %e, "Failed to close browser");
                }
            }
        }
    }
}
