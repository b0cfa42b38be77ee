//! ABOUTME: Matrix (fan-out) strategy declaration

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatrixStrategy {
    #[serde(rename = "type")]
    pub strategy_type: String,
    pub items_source: String,
    /// Dotted path into the loaded document, e.g. `results.items`.
    pub item_key: Option<String>,
    /// `0` means unlimited by the step (still capped by runtime).
    pub max_concurrency: usize,
}

impl Default for MatrixStrategy {
    fn default() -> Self {
        Self {
            strategy_type: "matrix".to_string(),
            items_source: String::new(),
            item_key: None,
            max_concurrency: 0,
        }
    }
}
