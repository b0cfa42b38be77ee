//! ABOUTME: Step hand-off configuration: retries, contract, compaction trigger

use crate::contract::ContractConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompactionConfig {
    /// e.g. `"token_limit_80%"`; overrides `runtime.relay.token_threshold_percent`.
    pub trigger: Option<String>,
    /// Overrides the runtime default summarizer persona.
    pub persona: Option<String>,
}

impl CompactionConfig {
    /// Parse a `token_limit_NN%` trigger string into its percentage, if present.
    #[must_use]
    pub fn trigger_percent(&self) -> Option<u8> {
        let trigger = self.trigger.as_ref()?;
        let pct = trigger.strip_prefix("token_limit_")?.strip_suffix('%')?;
        pct.parse().ok()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Handover {
    pub max_retries: Option<u32>,
    pub contract: ContractConfig,
    pub compaction: CompactionConfig,
}
