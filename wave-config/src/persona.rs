//! ABOUTME: Persona manifest entity: adapter binding, model params, permissions, sandbox
//! ABOUTME: Referenced by Step.persona

use serde::{Deserialize, Serialize};

/// Tool allow/deny list for a persona.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Permissions {
    pub allowed_tools: Vec<String>,
    pub deny: Vec<String>,
}

/// Per-persona sandbox override (an allow-list of network domains). The
/// sandbox itself is implemented outside this crate; this is just the
/// declarative knob forwarded to the adapter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaSandbox {
    pub allowed_domains: Vec<String>,
}

/// A named configuration for invoking an agent under a particular role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    pub name: String,
    pub adapter: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub system_prompt_file: Option<String>,
    #[serde(default)]
    pub permissions: Permissions,
    #[serde(default)]
    pub sandbox: Option<PersonaSandbox>,
}
