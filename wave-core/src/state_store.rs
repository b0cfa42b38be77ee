//! ABOUTME: State Store external collaborator interface
//! ABOUTME: The executor records through this trait; it never owns persistence

use crate::event::Event;
use crate::status::PipelineStatus;
use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

/// Persists pipeline/step state, registers artifacts, logs events, and
/// answers cancellation queries. A real deployment backs this with SQLite;
/// the orchestrator only ever calls these methods and never assumes a
/// storage engine.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn record_status(&self, status: &PipelineStatus) -> Result<()>;
    async fn register_artifact(&self, key: &str, path: &Path) -> Result<()>;
    async fn log_event(&self, event: &Event) -> Result<()>;
    async fn record_tag(&self, run_id: &str, key: &str, value: &str) -> Result<()>;
    async fn is_cancelled(&self, run_id: &str) -> bool;
    async fn load_status(&self, run_id: &str) -> Result<Option<PipelineStatus>>;
}

/// An in-memory `StateStore`, sufficient for tests and for single-process
/// deployments that don't need cross-restart durability.
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    statuses: Mutex<HashMap<String, PipelineStatus>>,
    artifacts: Mutex<HashMap<String, String>>,
    tags: Mutex<HashMap<String, HashMap<String, String>>>,
    cancelled: Mutex<std::collections::HashSet<String>>,
}

impl InMemoryStateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self, run_id: &str) {
        self.cancelled.lock().unwrap().insert(run_id.to_string());
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn record_status(&self, status: &PipelineStatus) -> Result<()> {
        self.statuses
            .lock()
            .unwrap()
            .insert(status.id.clone(), status.clone());
        Ok(())
    }

    async fn register_artifact(&self, key: &str, path: &Path) -> Result<()> {
        self.artifacts
            .lock()
            .unwrap()
            .insert(key.to_string(), path.to_string_lossy().to_string());
        Ok(())
    }

    async fn log_event(&self, _event: &Event) -> Result<()> {
        Ok(())
    }

    async fn record_tag(&self, run_id: &str, key: &str, value: &str) -> Result<()> {
        self.tags
            .lock()
            .unwrap()
            .entry(run_id.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn is_cancelled(&self, run_id: &str) -> bool {
        self.cancelled.lock().unwrap().contains(run_id)
    }

    async fn load_status(&self, run_id: &str) -> Result<Option<PipelineStatus>> {
        Ok(self.statuses.lock().unwrap().get(run_id).cloned())
    }
}
