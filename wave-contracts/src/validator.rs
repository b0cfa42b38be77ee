//! ABOUTME: Contract Validator: json_schema / test_suite / command hand-off gates

use jsonschema::JSONSchema;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use tracing::debug;
use wave_core::{Result, WaveError};
use wave_pipeline::{ContractConfig, ContractType};
use wave_security::path::PathSanitizer;

/// Validates a step's declared hand-off contract against the artifact it
/// produced. `json_schema` contracts compile their schema once and cache it,
/// since the same contract may be re-checked across several retries.
pub struct ContractValidator {
    path_sanitizer: Arc<dyn PathSanitizer>,
    compiled_schemas: Mutex<HashMap<String, Arc<JSONSchema>>>,
}

impl ContractValidator {
    #[must_use]
    pub fn new(path_sanitizer: Arc<dyn PathSanitizer>) -> Self {
        Self {
            path_sanitizer,
            compiled_schemas: Mutex::new(HashMap::new()),
        }
    }

    /// Validate `contract` for `step_id`. `artifact_path`, when present, is
    /// the path to the artifact the contract's `json_schema` check reads;
    /// `workspace_dir` is both the root for `schema_path` resolution and the
    /// default cwd for `test_suite`/`command` contracts.
    pub fn validate(
        &self,
        step_id: &str,
        contract: &ContractConfig,
        workspace_dir: &Path,
        artifact_path: Option<&Path>,
    ) -> Result<()> {
        match contract.contract_type {
            ContractType::Other => Ok(()),
            ContractType::JsonSchema => self.validate_json_schema(step_id, contract, workspace_dir, artifact_path),
            ContractType::TestSuite | ContractType::Command => {
                self.validate_command(step_id, contract, workspace_dir)
            }
        }
    }

    fn validate_json_schema(
        &self,
        step_id: &str,
        contract: &ContractConfig,
        workspace_dir: &Path,
        artifact_path: Option<&Path>,
    ) -> Result<()> {
        let Some(artifact_path) = artifact_path else {
            return Err(WaveError::ContractValidation {
                step_id: step_id.to_string(),
                message: "json_schema contract declared but step produced no artifact to validate".to_string(),
            });
        };

        let schema = self.compiled_schema(step_id, contract, workspace_dir)?;

        let content = std::fs::read_to_string(artifact_path).map_err(|e| WaveError::ContractValidation {
            step_id: step_id.to_string(),
            message: format!("failed to read artifact {}: {e}", artifact_path.display()),
        })?;
        let instance: serde_json::Value =
            serde_json::from_str(&content).map_err(|e| WaveError::ContractValidation {
                step_id: step_id.to_string(),
                message: format!("artifact {} is not valid JSON: {e}", artifact_path.display()),
            })?;

        if let Err(errors) = schema.validate(&instance) {
            let message = errors
                .map(|e| format!("{e}"))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(WaveError::ContractValidation {
                step_id: step_id.to_string(),
                message,
            });
        }
        Ok(())
    }

    fn compiled_schema(
        &self,
        step_id: &str,
        contract: &ContractConfig,
        workspace_dir: &Path,
    ) -> Result<Arc<JSONSchema>> {
        if let Some(cached) = self.compiled_schemas.lock().get(step_id) {
            return Ok(cached.clone());
        }

        let schema_value = if let Some(inline) = &contract.schema {
            inline.clone()
        } else if let Some(schema_path) = &contract.schema_path {
            let resolved = self
                .path_sanitizer
                .validate(Path::new(schema_path), workspace_dir)?;
            let content = std::fs::read_to_string(&resolved).map_err(|e| WaveError::ContractValidation {
                step_id: step_id.to_string(),
                message: format!("failed to read schema {}: {e}", resolved.display()),
            })?;
            serde_json::from_str(&content).map_err(|e| WaveError::ContractValidation {
                step_id: step_id.to_string(),
                message: format!("schema {} is not valid JSON: {e}", resolved.display()),
            })?
        } else {
            return Err(WaveError::ContractValidation {
                step_id: step_id.to_string(),
                message: "json_schema contract declared neither `schema` nor `schema_path`".to_string(),
            });
        };

        let compiled = JSONSchema::compile(&schema_value).map_err(|e| WaveError::ContractValidation {
            step_id: step_id.to_string(),
            message: format!("invalid json schema: {e}"),
        })?;
        let compiled = Arc::new(compiled);
        self.compiled_schemas
            .lock()
            .insert(step_id.to_string(), compiled.clone());
        Ok(compiled)
    }

    fn validate_command(&self, step_id: &str, contract: &ContractConfig, workspace_dir: &Path) -> Result<()> {
        let Some(command) = &contract.command else {
            return Err(WaveError::ContractValidation {
                step_id: step_id.to_string(),
                message: "test_suite/command contract declared no `command`".to_string(),
            });
        };
        let dir = contract
            .dir
            .as_ref()
            .map(|d| workspace_dir.join(d))
            .unwrap_or_else(|| workspace_dir.to_path_buf());

        debug!(step_id, command, dir = %dir.display(), "running contract command");
        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(&dir)
            .output()
            .map_err(|e| WaveError::ContractValidation {
                step_id: step_id.to_string(),
                message: format!("failed to spawn contract command: {e}"),
            })?;

        if !output.status.success() {
            return Err(WaveError::ContractValidation {
                step_id: step_id.to_string(),
                message: format!(
                    "contract command exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr)
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wave_security::path::RootedPathSanitizer;

    fn validator() -> ContractValidator {
        ContractValidator::new(Arc::new(RootedPathSanitizer))
    }

    #[test]
    fn undeclared_contract_always_passes() {
        let v = validator();
        let contract = ContractConfig::default();
        let dir = tempfile::tempdir().unwrap();
        assert!(v.validate("s1", &contract, dir.path(), None).is_ok());
    }

    #[test]
    fn json_schema_contract_validates_artifact() {
        let v = validator();
        let dir = tempfile::tempdir().unwrap();
        let artifact_path = dir.path().join("out.json");
        std::fs::write(&artifact_path, r#"{"status": "ok"}"#).unwrap();

        let contract = ContractConfig {
            contract_type: ContractType::JsonSchema,
            schema: Some(serde_json::json!({
                "type": "object",
                "required": ["status"],
                "properties": {"status": {"type": "string"}}
            })),
            ..ContractConfig::default()
        };
        assert!(v
            .validate("s1", &contract, dir.path(), Some(&artifact_path))
            .is_ok());
    }

    #[test]
    fn json_schema_contract_rejects_mismatched_artifact() {
        let v = validator();
        let dir = tempfile::tempdir().unwrap();
        let artifact_path = dir.path().join("out.json");
        std::fs::write(&artifact_path, r#"{"status": 5}"#).unwrap();

        let contract = ContractConfig {
            contract_type: ContractType::JsonSchema,
            schema: Some(serde_json::json!({
                "type": "object",
                "required": ["status"],
                "properties": {"status": {"type": "string"}}
            })),
            ..ContractConfig::default()
        };
        let err = v
            .validate("s1", &contract, dir.path(), Some(&artifact_path))
            .unwrap_err();
        assert!(matches!(err, WaveError::ContractValidation { .. }));
    }

    #[test]
    fn json_schema_contract_without_artifact_fails() {
        let v = validator();
        let dir = tempfile::tempdir().unwrap();
        let contract = ContractConfig {
            contract_type: ContractType::JsonSchema,
            schema: Some(serde_json::json!({"type": "object"})),
            ..ContractConfig::default()
        };
        assert!(v.validate("s1", &contract, dir.path(), None).is_err());
    }

    #[test]
    fn command_contract_runs_in_declared_dir() {
        let v = validator();
        let dir = tempfile::tempdir().unwrap();
        let contract = ContractConfig {
            contract_type: ContractType::Command,
            command: Some("test -f marker.txt".to_string()),
            ..ContractConfig::default()
        };
        std::fs::write(dir.path().join("marker.txt"), "").unwrap();
        assert!(v.validate("s1", &contract, dir.path(), None).is_ok());
    }

    #[test]
    fn command_contract_failure_is_reported() {
        let v = validator();
        let dir = tempfile::tempdir().unwrap();
        let contract = ContractConfig {
            contract_type: ContractType::Command,
            command: Some("exit 1".to_string()),
            ..ContractConfig::default()
        };
        assert!(v.validate("s1", &contract, dir.path(), None).is_err());
    }
}
