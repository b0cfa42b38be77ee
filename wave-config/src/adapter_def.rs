//! ABOUTME: Adapter manifest entity: which binary/mode a persona's adapter name resolves to

use serde::{Deserialize, Serialize};

/// A named adapter binding: `binary` is the subprocess executable looked up
/// on `PATH`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterDef {
    pub name: String,
    pub binary: String,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default = "default_output_format")]
    pub output_format: String,
}

fn default_output_format() -> String {
    "text".to_string()
}
