//! ABOUTME: Runtime manifest entity: workspace root, concurrency caps, meta-pipeline ceilings,
//! ABOUTME: relay/compaction defaults, sandbox defaults, and the routing table

use crate::routing::RoutingRule;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Global ceilings for meta-pipeline recursion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaPipelineConfig {
    pub max_depth: u32,
    pub max_steps: u32,
    pub max_tokens: u64,
    pub timeout_min: u64,
}

impl Default for MetaPipelineConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_steps: 100,
            max_tokens: 1_000_000,
            timeout_min: 30,
        }
    }
}

impl MetaPipelineConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_min * 60)
    }
}

/// Defaults for the Relay/Compaction Monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub token_threshold_percent: u8,
    pub default_persona: String,
    pub context_limit_tokens: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            token_threshold_percent: 80,
            default_persona: "summarizer".to_string(),
            context_limit_tokens: 200_000,
        }
    }
}

/// Runtime-wide sandbox defaults, overridden per-persona.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxDefaults {
    pub enabled: bool,
    pub allowed_domains: Vec<String>,
    pub env_passthrough: Vec<String>,
}

/// Global runtime settings shared by every run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub workspace_root: String,
    pub default_timeout_secs: u64,
    pub pipeline_id_hash_length: usize,
    pub max_concurrent_workers: usize,
    pub meta_pipeline: MetaPipelineConfig,
    pub relay: RelayConfig,
    pub sandbox: SandboxDefaults,
    pub routing: Vec<RoutingRule>,
    pub default_pipeline: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            workspace_root: "./.wave/workspaces".to_string(),
            default_timeout_secs: 600,
            pipeline_id_hash_length: 8,
            max_concurrent_workers: 10,
            meta_pipeline: MetaPipelineConfig::default(),
            relay: RelayConfig::default(),
            sandbox: SandboxDefaults::default(),
            routing: Vec::new(),
            default_pipeline: "default".to_string(),
        }
    }
}

impl RuntimeConfig {
    #[must_use]
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }
}
