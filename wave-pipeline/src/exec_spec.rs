//! ABOUTME: Step-level execution declaration: a prompt or a slash-command invocation

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecType {
    Prompt,
    SlashCommand,
}

impl Default for ExecType {
    fn default() -> Self {
        Self::Prompt
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecSpec {
    #[serde(rename = "type")]
    pub exec_type: ExecType,
    /// Inline prompt text (mutually exclusive with `source_path`).
    pub source: Option<String>,
    /// Path to a file containing the prompt text.
    pub source_path: Option<String>,
    /// Slash-command name, used when `exec_type == SlashCommand`.
    pub command: Option<String>,
    pub args: Vec<String>,
}
