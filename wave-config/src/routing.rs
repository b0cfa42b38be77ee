//! ABOUTME: Routing rule manifest entity consumed by the Router component

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One rule in the manifest's routing table. Rules are scanned in
/// priority-descending order, stable on ties; `pattern` may be empty (always
/// matches), an exact string, a `*`/`?` glob, or (when neither an exact nor
/// glob match succeeds) treated as a case-insensitive substring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingRule {
    pub pipeline: String,
    #[serde(default)]
    pub pattern: String,
    #[serde(default)]
    pub match_labels: HashMap<String, String>,
    #[serde(default)]
    pub priority: i32,
}
