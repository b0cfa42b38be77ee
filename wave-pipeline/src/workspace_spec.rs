//! ABOUTME: Step-level workspace declaration

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceType {
    #[serde(rename = "")]
    Fresh,
    Ref,
    Worktree,
}

impl Default for WorkspaceType {
    fn default() -> Self {
        Self::Fresh
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mount {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub read_only: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceSpec {
    #[serde(rename = "type")]
    pub workspace_type: WorkspaceType,
    pub r#ref: Option<String>,
    pub root: Option<String>,
    pub branch: Option<String>,
    pub base: Option<String>,
    pub mount: Vec<Mount>,
}
