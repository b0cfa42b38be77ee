//! ABOUTME: Hand-off contract declaration

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContractType {
    JsonSchema,
    TestSuite,
    Command,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OnFailure {
    Retry,
    Fail,
}

impl Default for OnFailure {
    fn default() -> Self {
        Self::Retry
    }
}

fn default_max_retries() -> u32 {
    1
}

fn default_must_pass() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractConfig {
    #[serde(rename = "type")]
    pub contract_type: ContractType,
    pub schema: Option<serde_json::Value>,
    pub schema_path: Option<String>,
    pub source: Option<String>,
    pub command: Option<String>,
    pub dir: Option<String>,
    #[serde(default = "default_must_pass")]
    pub must_pass: bool,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    pub on_failure: OnFailure,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            contract_type: ContractType::Other,
            schema: None,
            schema_path: None,
            source: None,
            command: None,
            dir: None,
            must_pass: default_must_pass(),
            max_retries: default_max_retries(),
            on_failure: OnFailure::default(),
        }
    }
}

impl ContractConfig {
    #[must_use]
    pub fn is_declared(&self) -> bool {
        !matches!(self.contract_type, ContractType::Other)
    }
}
