//! ABOUTME: Output artifact declaration

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactDef {
    pub name: String,
    /// Template-resolved at write time (may reference `{{ step_id }}` etc).
    pub path: String,
    #[serde(default = "default_artifact_type")]
    pub r#type: String,
}

fn default_artifact_type() -> String {
    "file".to_string()
}
