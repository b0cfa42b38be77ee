//! ABOUTME: Progress event emitted by the executor for UI/dashboard consumption
//! ABOUTME: EventSink is the external collaborator interface

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A progress/state-change event, emitted monotonically per step
/// (`running -> step_progress* -> retrying* -> {contract_passed|contract_failed|warning}* -> completed|failed`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: DateTime<Utc>,
    pub pipeline_id: String,
    pub step_id: Option<String>,
    pub state: String,
    pub persona: Option<String>,
    pub message: String,
    pub tool_name: Option<String>,
    pub tool_target: Option<String>,
    pub progress: Option<f32>,
    pub current_action: Option<String>,
    pub total_steps: Option<usize>,
    pub completed_steps: Option<usize>,
    pub duration_ms: Option<u64>,
    pub tokens_used: Option<u64>,
    pub artifacts: HashMap<String, String>,
}

impl Event {
    pub fn new(pipeline_id: impl Into<String>, state: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            pipeline_id: pipeline_id.into(),
            step_id: None,
            state: state.into(),
            persona: None,
            message: message.into(),
            tool_name: None,
            tool_target: None,
            progress: None,
            current_action: None,
            total_steps: None,
            completed_steps: None,
            duration_ms: None,
            tokens_used: None,
            artifacts: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_step(mut self, step_id: impl Into<String>) -> Self {
        self.step_id = Some(step_id.into());
        self
    }

    #[must_use]
    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = Some(persona.into());
        self
    }

    #[must_use]
    pub fn with_tool(mut self, tool_name: impl Into<String>, tool_target: Option<String>) -> Self {
        self.tool_name = Some(tool_name.into());
        self.tool_target = tool_target;
        self
    }

    #[must_use]
    pub fn with_progress(mut self, completed: usize, total: usize) -> Self {
        self.completed_steps = Some(completed);
        self.total_steps = Some(total);
        self.progress = Some(if total == 0 { 1.0 } else { completed as f32 / total as f32 });
        self
    }

    #[must_use]
    pub fn with_duration_ms(mut self, ms: u64) -> Self {
        self.duration_ms = Some(ms);
        self
    }

    #[must_use]
    pub fn with_tokens_used(mut self, tokens: u64) -> Self {
        self.tokens_used = Some(tokens);
        self
    }
}

/// External event sink (NDJSON, TUI, dashboard, ...). The executor only ever
/// calls `emit`; it never depends on how or whether the event is persisted.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: Event);
}

/// An `EventSink` that discards every event. Useful as a default and in
/// tests that don't assert on the event stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn emit(&self, _event: Event) {}
}

/// An in-memory `EventSink` backed by a mutex-guarded `Vec`, used by tests
/// that want to assert on emitted event ordering/content.
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: std::sync::Mutex<Vec<Event>>,
}

impl RecordingEventSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for RecordingEventSink {
    fn emit(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}
