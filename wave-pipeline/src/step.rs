//! ABOUTME: A single pipeline step

use crate::artifact::ArtifactDef;
use crate::exec_spec::ExecSpec;
use crate::handover::Handover;
use crate::matrix::MatrixStrategy;
use crate::model::Memory;
use crate::workspace_spec::WorkspaceSpec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

fn default_concurrency() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Step {
    pub id: String,
    pub persona: String,
    pub dependencies: HashSet<String>,
    pub optional: bool,
    pub memory: Memory,
    pub workspace: WorkspaceSpec,
    pub exec: ExecSpec,
    pub output_artifacts: Vec<ArtifactDef>,
    pub handover: Handover,
    pub strategy: Option<MatrixStrategy>,
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,
}

impl Default for Step {
    fn default() -> Self {
        Self {
            id: String::new(),
            persona: String::new(),
            dependencies: HashSet::new(),
            optional: false,
            memory: Memory::default(),
            workspace: WorkspaceSpec::default(),
            exec: ExecSpec::default(),
            output_artifacts: Vec::new(),
            handover: Handover::default(),
            strategy: None,
            concurrency: default_concurrency(),
        }
    }
}

impl Step {
    #[must_use]
    pub fn is_matrix(&self) -> bool {
        self.strategy.is_some()
    }

    /// Effective retry budget: `handover.max_retries` then
    /// `handover.contract.max_retries`, defaulting to 1.
    #[must_use]
    pub fn effective_max_retries(&self) -> u32 {
        self.handover
            .max_retries
            .unwrap_or(self.handover.contract.max_retries)
    }

    #[must_use]
    pub fn artifact_def(&self, name: &str) -> Option<&ArtifactDef> {
        self.output_artifacts.iter().find(|a| a.name == name)
    }
}
