//! ABOUTME: Artifact Transport: write-path registration and read-path injection

use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;
use wave_core::{Result, StateStore, WaveError};
use wave_pipeline::{ArtifactDef, Memory};
use wave_security::path::PathSanitizer;

/// Where a registered artifact actually lives: a file on disk, or (for
/// `type: text` artifacts, or as a last-resort injection fallback) the raw
/// text the adapter produced.
#[derive(Debug, Clone)]
pub enum ArtifactLocation {
    File(PathBuf),
    Text(String),
}

/// Tracks every artifact a step has produced this run (keyed
/// `"<step_id>:<artifact_name>"`) and hands them off to downstream steps
/// that declare `memory.inject_artifacts` references to them.
pub struct ArtifactTransport {
    path_sanitizer: Arc<dyn PathSanitizer>,
    store: Arc<dyn StateStore>,
    registry: Mutex<HashMap<String, ArtifactLocation>>,
}

impl ArtifactTransport {
    #[must_use]
    pub fn new(path_sanitizer: Arc<dyn PathSanitizer>, store: Arc<dyn StateStore>) -> Self {
        Self {
            path_sanitizer,
            store,
            registry: Mutex::new(HashMap::new()),
        }
    }

    /// Register the output artifact a step produced. `adapter_text` is the
    /// adapter's `result_content`: for `type: text` artifacts it *is* the
    /// artifact; for file artifacts it's written to the declared path only
    /// if the persona hasn't already written a non-empty file there itself
    /// (never clobber a real hand-written file with an empty fallback).
    pub async fn register_output(
        &self,
        step_id: &str,
        artifact: &ArtifactDef,
        workspace_dir: &Path,
        template_ctx: &wave_pipeline::TemplateContext,
        adapter_text: &str,
    ) -> Result<ArtifactLocation> {
        let location = if artifact.r#type == "text" {
            ArtifactLocation::Text(adapter_text.to_string())
        } else {
            let resolved_str = template_ctx.resolve_placeholders(&artifact.path);
            let validated = self
                .path_sanitizer
                .validate(Path::new(&resolved_str), workspace_dir)?;

            if validated.is_dir() {
                return Err(WaveError::ArtifactPathType {
                    path: validated.display().to_string(),
                });
            }

            let existing_nonempty = validated
                .metadata()
                .map(|m| m.len() > 0)
                .unwrap_or(false);

            if !existing_nonempty && !adapter_text.is_empty() {
                if let Some(parent) = validated.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(&validated, adapter_text)?;
            }

            ArtifactLocation::File(validated)
        };

        let key = format!("{step_id}:{}", artifact.name);
        if let ArtifactLocation::File(path) = &location {
            if let Err(e) = self.store.register_artifact(&key, path).await {
                warn!(key, error = %e, "failed to notify state store of new artifact");
            }
        }
        self.registry.lock().insert(key, location.clone());
        Ok(location)
    }

    /// Resolve every `memory.inject_artifacts` reference for a step into
    /// `.wave/artifacts/<as>` under `target_dir`. All unresolvable
    /// references are collected into a single `MissingArtifacts` error
    /// rather than failing on the first one, so a caller sees the whole
    /// gap at once.
    pub fn inject_inputs(
        &self,
        memory: &Memory,
        target_dir: &Path,
    ) -> Result<HashMap<String, ArtifactLocation>> {
        let registry = self.registry.lock();
        let mut missing = Vec::new();
        let mut resolved = HashMap::new();

        for reference in &memory.inject_artifacts {
            let key = format!("{}:{}", reference.step, reference.artifact);
            match registry.get(&key) {
                Some(ArtifactLocation::Text(text)) => {
                    resolved.insert(reference.as_name.clone(), ArtifactLocation::Text(text.clone()));
                }
                Some(ArtifactLocation::File(path)) => {
                    let dest_dir = target_dir.join(".wave").join("artifacts");
                    let dest = dest_dir.join(&reference.as_name);
                    match std::fs::create_dir_all(&dest_dir).and_then(|()| std::fs::copy(path, &dest)) {
                        Ok(_) => {
                            resolved.insert(reference.as_name.clone(), ArtifactLocation::File(dest));
                        }
                        Err(_) => match std::fs::read_to_string(path) {
                            Ok(text) => {
                                resolved.insert(reference.as_name.clone(), ArtifactLocation::Text(text));
                            }
                            Err(_) => missing.push(key),
                        },
                    }
                }
                None => missing.push(key),
            }
        }

        if !missing.is_empty() {
            return Err(WaveError::MissingArtifacts { missing });
        }
        Ok(resolved)
    }
}
