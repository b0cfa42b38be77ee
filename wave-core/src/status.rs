//! ABOUTME: Run and step status types shared between the executor and the state store
//! ABOUTME: Tracks a pipeline run's lifecycle and per-step progress

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Terminal/non-terminal state of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Pending,
    Running,
    Completed,
    Failed,
    Retrying,
}

impl RunState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Per-step state, tracked in `PipelineExecution::States`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    Pending,
    Running,
    Retrying,
    Completed,
    Failed,
    Skipped,
}

/// Externally queryable status of a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineStatus {
    pub id: String,
    pub pipeline_name: String,
    pub state: RunState,
    pub current_step: Option<String>,
    pub completed_steps: Vec<String>,
    pub failed_steps: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl PipelineStatus {
    #[must_use]
    pub fn new(id: impl Into<String>, pipeline_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            pipeline_name: pipeline_name.into(),
            state: RunState::Pending,
            current_step: None,
            completed_steps: Vec::new(),
            failed_steps: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
        }
    }
}
