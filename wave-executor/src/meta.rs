//! ABOUTME: Meta-Pipeline Executor: generates a child pipeline via the philosopher persona,
//! ABOUTME: validates it, and executes it under global depth/step/token ceilings

use crate::pipeline::PipelineExecutor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, warn};
use wave_adapter::{Adapter, AdapterRunConfig, StreamEvent};
use wave_config::MetaPipelineConfig;
use wave_core::{PipelineStatus, Result, StepError, WaveError};
use wave_pipeline::{parse_pipeline, validate, validate_generated_pipeline, Pipeline};

const PIPELINE_MARKER: &str = "--- PIPELINE ---";
const SCHEMAS_MARKER: &str = "--- SCHEMAS ---";

/// Result of one `MetaPipelineExecutor::execute` call. The generated
/// pipeline is always returned, even when the child run itself failed, so a
/// caller can inspect what was generated.
pub struct MetaPipelineResult {
    pub pipeline: Pipeline,
    pub run: std::result::Result<PipelineStatus, StepError>,
}

/// Counters shared across a meta-pipeline recursion chain: a child executor
/// created via `create_child` carries the same `Arc`s forward so ceilings
/// are enforced against the whole chain's usage, not just one level.
struct SharedCounters {
    total_steps_used: AtomicU32,
    total_tokens_used: AtomicU64,
}

pub struct MetaPipelineExecutor {
    config: MetaPipelineConfig,
    adapter: Arc<dyn Adapter>,
    adapter_binary: String,
    philosopher_persona: String,
    schema_dir: PathBuf,
    pipeline_executor: Arc<PipelineExecutor>,
    current_depth: u32,
    counters: Arc<SharedCounters>,
    parent_pipeline_id: Option<String>,
    call_stack: Vec<String>,
}

impl MetaPipelineExecutor {
    #[must_use]
    pub fn new(
        config: MetaPipelineConfig,
        adapter: Arc<dyn Adapter>,
        adapter_binary: impl Into<String>,
        philosopher_persona: impl Into<String>,
        schema_dir: impl Into<PathBuf>,
        pipeline_executor: Arc<PipelineExecutor>,
    ) -> Self {
        Self {
            config,
            adapter,
            adapter_binary: adapter_binary.into(),
            philosopher_persona: philosopher_persona.into(),
            schema_dir: schema_dir.into(),
            pipeline_executor,
            current_depth: 0,
            counters: Arc::new(SharedCounters {
                total_steps_used: AtomicU32::new(0),
                total_tokens_used: AtomicU64::new(0),
            }),
            parent_pipeline_id: None,
            call_stack: Vec::new(),
        }
    }

    /// `CreateChildMetaExecutor`: depth+1, counters carried forward, parent
    /// id set to the current run's pipeline id.
    #[must_use]
    pub fn create_child(&self, parent_pipeline_id: impl Into<String>) -> Self {
        let parent_pipeline_id = parent_pipeline_id.into();
        let mut call_stack = self.call_stack.clone();
        call_stack.push(parent_pipeline_id.clone());
        Self {
            config: self.config.clone(),
            adapter: self.adapter.clone(),
            adapter_binary: self.adapter_binary.clone(),
            philosopher_persona: self.philosopher_persona.clone(),
            schema_dir: self.schema_dir.clone(),
            pipeline_executor: self.pipeline_executor.clone(),
            current_depth: self.current_depth + 1,
            counters: self.counters.clone(),
            parent_pipeline_id: Some(parent_pipeline_id),
            call_stack,
        }
    }

    pub async fn execute(&self, task: &str, workspace_dir: &Path) -> Result<MetaPipelineResult> {
        self.check_depth_limit()?;

        let prompt = format!(
            "You are the navigator's planner. Given the following task, produce a \
             complete WavePipeline YAML document whose first step uses persona \
             'navigator', every step declares a handover contract, and every step's \
             memory strategy is 'fresh'. Emit the pipeline delimited by \
             '{PIPELINE_MARKER}' and any JSON schemas it references delimited by \
             '{SCHEMAS_MARKER}' as a single JSON object mapping relative schema path \
             to schema body.\n\nTask: {task}"
        );

        let config = AdapterRunConfig::new(
            self.adapter_binary.clone(),
            self.philosopher_persona.clone(),
            workspace_dir.to_path_buf(),
            prompt,
        );
        let result = self
            .adapter
            .run(config, Arc::new(|_: StreamEvent| {}))
            .await
            .map_err(|e| WaveError::Internal {
                message: format!("philosopher invocation failed: {e}"),
            })?;

        self.counters.total_tokens_used.fetch_add(result.tokens_used, Ordering::SeqCst);
        let tokens_used = self.counters.total_tokens_used.load(Ordering::SeqCst);
        if tokens_used > self.config.max_tokens {
            return Err(WaveError::TokenLimit { used: tokens_used, limit: self.config.max_tokens });
        }

        let (pipeline_yaml, schemas) = parse_philosopher_output(&result.result_content)?;
        let pipeline = parse_pipeline(&pipeline_yaml)?;

        let steps_used = self.counters.total_steps_used.fetch_add(pipeline.steps.len() as u32, Ordering::SeqCst) + pipeline.steps.len() as u32;
        if steps_used > self.config.max_steps {
            return Err(WaveError::StepLimit { used: steps_used, limit: self.config.max_steps });
        }

        for (relative_path, schema_value) in &schemas {
            self.persist_schema(relative_path, schema_value)?;
        }

        validate(&pipeline)?;
        validate_generated_pipeline(&pipeline).map_err(|e| WaveError::GeneratedPipelineInvalid { message: e.to_string() })?;
        self.check_schema_files_exist(&pipeline)?;

        let run = self
            .pipeline_executor
            .execute(&pipeline, Some(task.to_string()))
            .await;

        Ok(MetaPipelineResult { pipeline, run })
    }

    fn check_depth_limit(&self) -> Result<()> {
        if self.current_depth >= self.config.max_depth {
            return Err(WaveError::DepthLimit {
                current: self.current_depth,
                max: self.config.max_depth,
                stack: self.call_stack.join(" -> "),
            });
        }
        Ok(())
    }

    fn persist_schema(&self, relative_path: &str, value: &serde_json::Value) -> Result<()> {
        let pretty = serde_json::to_string_pretty(value).map_err(|e| WaveError::GeneratedPipelineInvalid {
            message: format!("schema '{relative_path}' could not be formatted: {e}"),
        })?;
        let dest = self.schema_dir.join(relative_path);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&dest, pretty)?;
        info!(path = %dest.display(), "persisted generated pipeline schema");
        Ok(())
    }

    /// Per-step schema-file sanity: every `json_schema` contract that names
    /// a `schema_path` must resolve to a file under `schema_dir` that this
    /// executor just persisted (or that already existed).
    fn check_schema_files_exist(&self, pipeline: &Pipeline) -> Result<()> {
        for step in &pipeline.steps {
            if step.handover.contract.contract_type != wave_pipeline::ContractType::JsonSchema {
                continue;
            }
            if let Some(schema_path) = &step.handover.contract.schema_path {
                let resolved = self.schema_dir.join(schema_path);
                if !resolved.exists() {
                    return Err(WaveError::GeneratedPipelineInvalid {
                        message: format!(
                            "generated step '{}' references schema_path '{schema_path}' which was not produced by the philosopher",
                            step.id
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Parse the philosopher's raw output into (pipeline YAML, schemas map).
/// Prefers the structured `--- PIPELINE ---` / `--- SCHEMAS ---` form;
/// falls back to stripping markdown fences or seeking the first `kind:`
/// line when the markers are absent.
fn parse_philosopher_output(raw: &str) -> Result<(String, std::collections::HashMap<String, serde_json::Value>)> {
    if let Some(pipeline_start) = raw.find(PIPELINE_MARKER) {
        let after_marker = &raw[pipeline_start + PIPELINE_MARKER.len()..];
        let (pipeline_part, schemas_part) = match after_marker.find(SCHEMAS_MARKER) {
            Some(schemas_start) => (&after_marker[..schemas_start], Some(&after_marker[schemas_start + SCHEMAS_MARKER.len()..])),
            None => (after_marker, None),
        };

        let schemas = match schemas_part {
            Some(raw_schemas) => parse_schemas_block(raw_schemas)?,
            None => std::collections::HashMap::new(),
        };
        return Ok((pipeline_part.trim().to_string(), schemas));
    }

    warn!("philosopher output had no structured markers, falling back to legacy extraction");
    Ok((legacy_extract_yaml(raw), std::collections::HashMap::new()))
}

fn parse_schemas_block(raw: &str) -> Result<std::collections::HashMap<String, serde_json::Value>> {
    let stripped = strip_markdown_fences(raw.trim());
    let lint_target = strip_trailing_commas(&stripped);
    let value: serde_json::Value = serde_json::from_str(&lint_target).map_err(|e| WaveError::GeneratedPipelineInvalid {
        message: format!("schemas block is not valid JSON after lint: {e}"),
    })?;
    let object = value.as_object().ok_or_else(|| WaveError::GeneratedPipelineInvalid {
        message: "schemas block must be a JSON object mapping path to schema".to_string(),
    })?;
    Ok(object.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
}

fn strip_markdown_fences(raw: &str) -> String {
    raw.lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Legacy fallback: strip markdown fences, then start at the first line
/// beginning with `kind:` (the document's natural top-level key).
fn legacy_extract_yaml(raw: &str) -> String {
    let stripped = strip_markdown_fences(raw);
    match stripped.find("kind:") {
        Some(start) => stripped[start..].trim().to_string(),
        None => stripped.trim().to_string(),
    }
}

/// Remove commas immediately followed (ignoring whitespace) by a closing
/// `}` or `]`. A pragmatic lint pass, not a full JSON5 parser: it does not
/// special-case commas inside string literals.
fn strip_trailing_commas(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == ',' {
            let mut j = i + 1;
            while j < chars.len() && chars[j].is_whitespace() {
                j += 1;
            }
            if j < chars.len() && (chars[j] == '}' || chars[j] == ']') {
                i += 1;
                continue;
            }
        }
        out.push(c);
        i += 1;
    }
    out
}
