//! ABOUTME: Typed representation of the pipeline YAML document
//! ABOUTME: Unknown top-level keys are ignored by serde's default struct parsing; `kind`
//! ABOUTME: defaults to "WavePipeline" when absent. Numeric booleans are rejected (strict typing).

use crate::step::Step;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

fn default_kind() -> String {
    "WavePipeline".to_string()
}

/// Top-level pipeline document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Pipeline {
    #[serde(default = "default_kind")]
    pub kind: String,
    pub metadata: PipelineMetadata,
    pub input: InputSpec,
    pub requires: Requires,
    pub steps: Vec<Step>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self {
            kind: default_kind(),
            metadata: PipelineMetadata::default(),
            input: InputSpec::default(),
            requires: Requires::default(),
            steps: Vec::new(),
        }
    }
}

impl Pipeline {
    /// `kind` is valid iff it is `"WavePipeline"` or empty.
    #[must_use]
    pub fn has_valid_kind(&self) -> bool {
        self.kind.is_empty() || self.kind == "WavePipeline"
    }

    #[must_use]
    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineMetadata {
    pub name: String,
    pub description: String,
    pub release: String,
    pub disabled: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSpec {
    pub source: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Requires {
    pub tools: HashSet<String>,
    pub skills: HashSet<String>,
}

/// Memory handling for a step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryStrategy {
    Fresh,
    Persistent,
    #[serde(other)]
    Other,
}

impl Default for MemoryStrategy {
    fn default() -> Self {
        Self::Fresh
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub step: String,
    pub artifact: String,
    #[serde(rename = "as")]
    pub as_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Memory {
    pub strategy: MemoryStrategy,
    pub inject_artifacts: Vec<ArtifactRef>,
}
