//! ABOUTME: Adapter subprocess interface
//! ABOUTME: The executor calls Adapter::run; adapters are the only component that actually
//! ABOUTME: shells out to an LLM CLI. This crate defines the contract plus a mock for testing.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use wave_core::Result;

/// A single tool-use (or other) event streamed back from the adapter while
/// it runs. The Step Runner bridges `type == "tool_use"` events with a
/// non-empty `tool_name` into pipeline `Event`s.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub tool_name: Option<String>,
    pub tool_input: Option<serde_json::Value>,
    pub content: Option<String>,
}

/// Callback invoked by the adapter for every streamed event. Cheaply
/// cloneable (`Arc<dyn Fn>`), so it can be handed to a subprocess-reading
/// task without borrowing the Step Runner.
pub type StreamCallback = Arc<dyn Fn(StreamEvent) + Send + Sync>;

/// Sandbox policy forwarded to the adapter; the orchestrator never
/// interprets or enforces it itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SandboxPolicy {
    pub enabled: bool,
    pub allowed_domains: Vec<String>,
    pub env_passthrough: Vec<String>,
}

/// Full configuration for a single adapter invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterRunConfig {
    pub adapter_binary: String,
    pub persona: String,
    pub workspace: PathBuf,
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub timeout: Duration,
    pub temperature: Option<f32>,
    pub model: Option<String>,
    pub allowed_tools: Vec<String>,
    pub deny_tools: Vec<String>,
    pub output_format: String,
    pub debug: bool,
    pub sandbox: SandboxPolicy,
    pub skill_commands_dir: Option<PathBuf>,
}

impl AdapterRunConfig {
    #[must_use]
    pub fn new(adapter_binary: impl Into<String>, persona: impl Into<String>, workspace: PathBuf, prompt: impl Into<String>) -> Self {
        Self {
            adapter_binary: adapter_binary.into(),
            persona: persona.into(),
            workspace,
            prompt: prompt.into(),
            system_prompt: None,
            timeout: Duration::from_secs(600),
            temperature: None,
            model: None,
            allowed_tools: Vec::new(),
            deny_tools: Vec::new(),
            output_format: "text".to_string(),
            debug: false,
            sandbox: SandboxPolicy::default(),
            skill_commands_dir: None,
        }
    }
}

/// Why an adapter invocation failed, when it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    RateLimit,
    Timeout,
    NonZeroExit,
    Crashed,
}

/// Outcome of a single adapter invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterResult {
    pub stdout: String,
    pub exit_code: i32,
    pub tokens_used: u64,
    pub result_content: String,
    pub failure_reason: Option<FailureReason>,
    /// Opaque artifact metadata surfaced by the adapter (e.g. `modified_files`
    /// for matrix conflict detection).
    pub artifacts: HashMap<String, serde_json::Value>,
}

impl AdapterResult {
    #[must_use]
    pub fn success(result_content: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            exit_code: 0,
            tokens_used: 0,
            result_content: result_content.into(),
            failure_reason: None,
            artifacts: HashMap::new(),
        }
    }

    #[must_use]
    pub fn modified_files(&self) -> Vec<String> {
        self.artifacts
            .get("modified_files")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// The subprocess contract: invoke an agent and stream its tool-use events.
#[async_trait]
pub trait Adapter: Send + Sync {
    async fn run(&self, config: AdapterRunConfig, on_event: StreamCallback) -> Result<AdapterResult>;
}

/// A scriptable mock adapter for tests: returns a fixed (or per-call)
/// result without spawning any process.
pub struct MockAdapter<F>
where
    F: Fn(&AdapterRunConfig) -> Result<AdapterResult> + Send + Sync,
{
    responder: F,
}

impl<F> MockAdapter<F>
where
    F: Fn(&AdapterRunConfig) -> Result<AdapterResult> + Send + Sync,
{
    pub fn new(responder: F) -> Self {
        Self { responder }
    }
}

#[async_trait]
impl<F> Adapter for MockAdapter<F>
where
    F: Fn(&AdapterRunConfig) -> Result<AdapterResult> + Send + Sync,
{
    async fn run(&self, config: AdapterRunConfig, on_event: StreamCallback) -> Result<AdapterResult> {
        on_event(StreamEvent {
            event_type: "tool_use".to_string(),
            tool_name: Some("mock_tool".to_string()),
            tool_input: None,
            content: None,
        });
        (self.responder)(&config)
    }
}
