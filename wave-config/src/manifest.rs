//! ABOUTME: Central Manifest type: personas, adapters, and runtime settings
//! ABOUTME: Parses TOML, applies LLMSPELL_/WAVE_-style env overrides, then validates

use crate::adapter_def::AdapterDef;
use crate::persona::Persona;
use crate::runtime::RuntimeConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env as std_env;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Errors raised while loading or validating a manifest.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read manifest file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse manifest TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("manifest validation failed: {0}")]
    Validation(String),
}

/// The full external manifest: named personas, named adapters, and runtime
/// settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Manifest {
    pub personas: HashMap<String, Persona>,
    pub adapters: HashMap<String, AdapterDef>,
    pub runtime: RuntimeConfig,
}

impl Manifest {
    /// Load and validate a manifest from a TOML file on disk.
    pub async fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_toml(&content)
    }

    /// Parse TOML content, apply `WAVE_`-prefixed environment overrides, then validate.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let mut manifest: Manifest = toml::from_str(content)?;
        manifest.apply_env_overrides();
        manifest.validate()?;
        Ok(manifest)
    }

    /// Apply a small set of environment variable overrides, following the
    /// teacher's `LLMSpellConfig::apply_env_registry` pattern at a scale
    /// appropriate for this orchestrator's runtime knobs.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(root) = std_env::var("WAVE_WORKSPACE_ROOT") {
            debug!(root, "overriding runtime.workspace_root from WAVE_WORKSPACE_ROOT");
            self.runtime.workspace_root = root;
        }
        if let Ok(max) = std_env::var("WAVE_MAX_CONCURRENT_WORKERS") {
            if let Ok(max) = max.parse() {
                self.runtime.max_concurrent_workers = max;
            }
        }
        if let Ok(depth) = std_env::var("WAVE_META_MAX_DEPTH") {
            if let Ok(depth) = depth.parse() {
                self.runtime.meta_pipeline.max_depth = depth;
            }
        }
    }

    /// Structural validation: every persona must name an adapter that exists.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (persona_name, persona) in &self.personas {
            if persona_name != &persona.name {
                return Err(ConfigError::Validation(format!(
                    "persona key '{persona_name}' does not match persona.name '{}'",
                    persona.name
                )));
            }
            if !self.adapters.contains_key(&persona.adapter) {
                return Err(ConfigError::Validation(format!(
                    "persona '{persona_name}' references unknown adapter '{}'",
                    persona.adapter
                )));
            }
        }
        if self.runtime.max_concurrent_workers == 0 {
            return Err(ConfigError::Validation(
                "runtime.max_concurrent_workers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn persona(&self, name: &str) -> Option<&Persona> {
        self.personas.get(name)
    }

    #[must_use]
    pub fn adapter(&self, name: &str) -> Option<&AdapterDef> {
        self.adapters.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_toml() -> &'static str {
        r#"
            [personas.navigator]
            name = "navigator"
            adapter = "claude"
            model = "claude-sonnet"

            [adapters.claude]
            name = "claude"
            binary = "claude"

            [runtime]
            workspace_root = "./.wave/workspaces"
            max_concurrent_workers = 4
        "#
    }

    #[test]
    fn parses_and_validates_a_well_formed_manifest() {
        let manifest = Manifest::from_toml(sample_toml()).unwrap();
        assert_eq!(manifest.personas.len(), 1);
        assert!(manifest.persona("navigator").is_some());
        assert_eq!(manifest.runtime.max_concurrent_workers, 4);
    }

    #[test]
    fn rejects_persona_with_unknown_adapter() {
        let toml = r#"
            [personas.navigator]
            name = "navigator"
            adapter = "ghost"
        "#;
        let err = Manifest::from_toml(toml).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn env_override_changes_workspace_root() {
        std::env::set_var("WAVE_WORKSPACE_ROOT", "/tmp/override-root");
        let manifest = Manifest::from_toml(sample_toml()).unwrap();
        assert_eq!(manifest.runtime.workspace_root, "/tmp/override-root");
        std::env::remove_var("WAVE_WORKSPACE_ROOT");
    }
}
