//! ABOUTME: Step Runner: resolves persona/adapter, materializes a workspace, builds the prompt,
//! ABOUTME: invokes the adapter, validates the contract, and retries on failure

use crate::skill::SkillProvisioner;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use wave_adapter::{Adapter, AdapterRunConfig, FailureReason, SandboxPolicy, StreamCallback, StreamEvent};
use wave_artifacts::{ArtifactLocation, ArtifactTransport};
use wave_config::Manifest;
use wave_contracts::ContractValidator;
use wave_core::{Event, EventSink, Result, StateStore, StepError, WaveError};
use wave_pipeline::{ContractType, OnFailure, Step, TemplateContext};
use wave_relay::CompactionMonitor;
use wave_security::{InputSanitizer, PathSanitizer};
use wave_workspace::WorkspaceManager;

/// Every external collaborator the Step Runner needs, grouped so
/// constructing a runner for a run only takes one argument.
pub struct StepRunnerDeps {
    pub manifest: Arc<Manifest>,
    pub adapters: std::collections::HashMap<String, Arc<dyn Adapter>>,
    pub input_sanitizer: Arc<dyn InputSanitizer>,
    pub path_sanitizer: Arc<dyn PathSanitizer>,
    pub contract_validator: Arc<ContractValidator>,
    pub artifact_transport: Arc<ArtifactTransport>,
    pub workspace_manager: Arc<WorkspaceManager>,
    pub skill_provisioner: Arc<dyn SkillProvisioner>,
    /// Pipeline-level `requires.skills`, provisioned identically for every step.
    pub required_skills: std::collections::HashSet<String>,
    pub compaction_monitor: Arc<CompactionMonitor>,
    pub event_sink: Arc<dyn EventSink>,
    pub state_store: Arc<dyn StateStore>,
}

pub struct StepRunner {
    deps: Arc<StepRunnerDeps>,
}

impl StepRunner {
    #[must_use]
    pub fn new(deps: Arc<StepRunnerDeps>) -> Self {
        Self { deps }
    }

    /// Run `step` to completion (with retries), honoring `cancellation`
    /// between attempts: resolve -> materialize workspace -> inject inputs ->
    /// build prompt -> invoke adapter -> register outputs -> validate
    /// contract -> retry.
    pub async fn run(
        &self,
        pipeline_id: &str,
        step: &Step,
        template_ctx: &TemplateContext,
        cancellation: &CancellationToken,
    ) -> std::result::Result<(), StepError> {
        self.try_run(pipeline_id, step, template_ctx, cancellation)
            .await
            .map(|_modified_files| ())
            .map_err(|e| StepError::new(step.id.clone(), e))
    }

    /// Same as `run`, but also surfaces the adapter's reported
    /// `modified_files` from the successful attempt, so the Matrix Executor
    /// can detect cross-worker write conflicts.
    pub async fn run_collecting_modified_files(
        &self,
        pipeline_id: &str,
        step: &Step,
        template_ctx: &TemplateContext,
        cancellation: &CancellationToken,
    ) -> std::result::Result<Vec<String>, StepError> {
        self.try_run(pipeline_id, step, template_ctx, cancellation)
            .await
            .map_err(|e| StepError::new(step.id.clone(), e))
    }

    async fn try_run(
        &self,
        pipeline_id: &str,
        step: &Step,
        template_ctx: &TemplateContext,
        cancellation: &CancellationToken,
    ) -> Result<Vec<String>> {
        let persona = self
            .deps
            .manifest
            .persona(&step.persona)
            .ok_or_else(|| WaveError::UnknownPersona { name: step.persona.clone() })?
            .clone();
        let adapter_def = self
            .deps
            .manifest
            .adapter(&persona.adapter)
            .ok_or_else(|| WaveError::UnknownAdapter { name: persona.adapter.clone() })?
            .clone();
        let adapter = self
            .deps
            .adapters
            .get(&adapter_def.name)
            .cloned()
            .ok_or_else(|| WaveError::UnknownAdapter { name: adapter_def.name.clone() })?;

        let workspace_dir = self.deps.workspace_manager.workspace_for(step, template_ctx)?;

        self.inject_inputs(step, template_ctx, &workspace_dir)?;

        let skill_dir = self
            .deps
            .skill_provisioner
            .provision(&self.deps.required_skills, &workspace_dir)?;

        let allowed_tools = effective_allowed_tools(step, &persona);
        let sandbox = resolve_sandbox(&persona, &self.deps.manifest.runtime.sandbox);

        let max_retries = if step.handover.contract.on_failure == OnFailure::Fail {
            1
        } else {
            step.effective_max_retries().max(1)
        };

        let mut last_err = None;
        for attempt in 1..=max_retries {
            if cancellation.is_cancelled() || self.deps.state_store.is_cancelled(pipeline_id).await {
                return Err(WaveError::Cancelled);
            }

            let prompt = self.build_prompt(step, template_ctx)?;
            let mut config = AdapterRunConfig::new(
                adapter_def.binary.clone(),
                persona.name.clone(),
                workspace_dir.clone(),
                prompt,
            );
            config.model = persona.model.clone();
            config.temperature = persona.temperature;
            config.allowed_tools = allowed_tools.clone();
            config.deny_tools = persona.permissions.deny.clone();
            config.output_format = adapter_def.output_format.clone();
            config.sandbox = sandbox.clone();
            config.skill_commands_dir = skill_dir.clone();

            self.emit(pipeline_id, step, "running", "invoking adapter");

            match self.invoke_with_heartbeat(pipeline_id, step, &adapter, config).await {
                Ok(result) => {
                    if result.exit_code != 0 {
                        warn!(step_id = %step.id, exit_code = result.exit_code, "adapter exited non-zero, continuing to contract validation");
                        self.emit(pipeline_id, step, "warning", &format!("adapter exited with code {}", result.exit_code));
                    }

                    let primary_artifact = self.register_outputs(step, template_ctx, &workspace_dir, &result.result_content).await?;

                    match self.deps.contract_validator.validate(
                        &step.id,
                        &step.handover.contract,
                        &workspace_dir,
                        primary_artifact.as_deref(),
                    ) {
                        Ok(()) => {
                            self.emit(pipeline_id, step, "contract_passed", "handover contract satisfied");
                            self.deps
                                .compaction_monitor
                                .maybe_compact(&step.id, &step.handover.compaction, result.tokens_used, &workspace_dir, template_ctx)
                                .await;
                            self.emit(pipeline_id, step, "completed", "step completed");
                            return Ok(result.modified_files());
                        }
                        Err(e) => {
                            self.emit(pipeline_id, step, "contract_failed", &e.to_string());
                            last_err = Some(e);
                        }
                    }
                }
                Err(WaveError::AdapterRateLimit { step_id, message }) => {
                    // Rate limits are fatal: they never consume the retry budget.
                    return Err(WaveError::AdapterRateLimit { step_id, message });
                }
                Err(e) => {
                    last_err = Some(e);
                }
            }

            if attempt < max_retries {
                self.emit(pipeline_id, step, "retrying", &format!("retrying after attempt {attempt}"));
                tokio::time::sleep(Duration::from_secs(u64::from(attempt))).await;
            }
        }

        Err(last_err.unwrap_or(WaveError::Internal {
            message: format!("step '{}' exhausted retries with no recorded error", step.id),
        }))
    }

    fn inject_inputs(&self, step: &Step, template_ctx: &TemplateContext, workspace_dir: &std::path::Path) -> Result<()> {
        let resolved = self.deps.artifact_transport.inject_inputs(&step.memory, workspace_dir)?;
        for (as_name, location) in resolved {
            match location {
                ArtifactLocation::File(path) => {
                    template_ctx.set_artifact_path(as_name, path.display().to_string());
                }
                ArtifactLocation::Text(text) => {
                    let dest_dir = workspace_dir.join(".wave").join("artifacts");
                    std::fs::create_dir_all(&dest_dir)?;
                    let dest = dest_dir.join(&as_name);
                    std::fs::write(&dest, &text)?;
                    template_ctx.set_artifact_path(as_name, dest.display().to_string());
                }
            }
        }
        Ok(())
    }

    fn build_prompt(&self, step: &Step, template_ctx: &TemplateContext) -> Result<String> {
        let raw = match step.exec.exec_type {
            wave_pipeline::ExecType::SlashCommand => {
                let command = step.exec.command.clone().unwrap_or_default();
                format!("/{command} {}", step.exec.args.join(" "))
            }
            wave_pipeline::ExecType::Prompt => {
                if let Some(source) = &step.exec.source {
                    source.clone()
                } else if let Some(path) = &step.exec.source_path {
                    let resolved = self.deps.path_sanitizer.validate(std::path::Path::new(path), std::path::Path::new("."))?;
                    std::fs::read_to_string(resolved)?
                } else {
                    String::new()
                }
            }
        };

        let sanitized = self.deps.input_sanitizer.sanitize(&raw).into_text();

        let with_schema = if step.handover.contract.contract_type == ContractType::JsonSchema {
            let schema_hint = step
                .handover
                .contract
                .schema
                .as_ref()
                .map(|s| s.to_string())
                .or_else(|| step.handover.contract.schema_path.clone())
                .unwrap_or_else(|| "(see contract)".to_string());
            format!(
                "{sanitized}\n\nOutput requirements: produce a single artifact matching this JSON schema exactly:\n{schema_hint}"
            )
        } else {
            sanitized
        };

        Ok(template_ctx.resolve_placeholders(&with_schema))
    }

    async fn register_outputs(
        &self,
        step: &Step,
        template_ctx: &TemplateContext,
        workspace_dir: &std::path::Path,
        adapter_text: &str,
    ) -> Result<Option<std::path::PathBuf>> {
        let mut primary = None;
        for artifact in &step.output_artifacts {
            let location = self
                .deps
                .artifact_transport
                .register_output(&step.id, artifact, workspace_dir, template_ctx, adapter_text)
                .await?;
            if primary.is_none() {
                if let ArtifactLocation::File(path) = &location {
                    primary = Some(path.clone());
                }
            }
        }
        Ok(primary)
    }

    async fn invoke_with_heartbeat(
        &self,
        pipeline_id: &str,
        step: &Step,
        adapter: &Arc<dyn Adapter>,
        config: AdapterRunConfig,
    ) -> Result<wave_adapter::AdapterResult> {
        let event_sink = self.deps.event_sink.clone();
        let pipeline_id_owned = pipeline_id.to_string();
        let step_id = step.id.clone();
        let persona = step.persona.clone();
        let callback: StreamCallback = Arc::new(move |event: StreamEvent| {
            if event.event_type == "tool_use" {
                if let Some(tool_name) = &event.tool_name {
                    event_sink.emit(
                        Event::new(&pipeline_id_owned, "step_progress", "tool invoked")
                            .with_step(step_id.clone())
                            .with_persona(persona.clone())
                            .with_tool(tool_name.clone(), event.content.clone()),
                    );
                }
            }
        });

        let heartbeat_sink = self.deps.event_sink.clone();
        let heartbeat_pipeline = pipeline_id.to_string();
        let heartbeat_step = step.id.clone();
        let heartbeat = tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(1));
            ticker.tick().await; // first tick fires immediately; skip it
            loop {
                ticker.tick().await;
                heartbeat_sink.emit(
                    Event::new(&heartbeat_pipeline, "step_progress", "still running")
                        .with_step(heartbeat_step.clone()),
                );
            }
        });

        let result = adapter.run(config, callback).await;
        heartbeat.abort();

        match &result {
            Ok(outcome) if outcome.failure_reason == Some(FailureReason::RateLimit) => {
                return Err(WaveError::AdapterRateLimit {
                    step_id: step.id.clone(),
                    message: "adapter reported a rate limit".to_string(),
                });
            }
            Err(_) => {
                info!(step_id = %step.id, "adapter invocation returned an error");
            }
            _ => {}
        }
        result.map_err(|e| WaveError::AdapterInvocation {
            step_id: step.id.clone(),
            message: e.to_string(),
        })
    }

    fn emit(&self, pipeline_id: &str, step: &Step, state: &str, message: &str) {
        self.deps.event_sink.emit(
            Event::new(pipeline_id, state, message)
                .with_step(step.id.clone())
                .with_persona(step.persona.clone()),
        );
    }
}

/// Allowed tools for a step's adapter invocation: the persona's allow-list,
/// plus an auto-granted `Write` when the step declares output artifacts (it
/// cannot hand off a file it isn't allowed to create), minus anything the
/// persona explicitly denies.
fn effective_allowed_tools(step: &Step, persona: &wave_config::Persona) -> Vec<String> {
    let mut tools = persona.permissions.allowed_tools.clone();
    if !step.output_artifacts.is_empty() && !tools.iter().any(|t| t == "Write") {
        tools.push("Write".to_string());
    }
    tools.retain(|t| !persona.permissions.deny.contains(t));
    tools
}

fn resolve_sandbox(persona: &wave_config::Persona, defaults: &wave_config::SandboxDefaults) -> SandboxPolicy {
    match &persona.sandbox {
        Some(override_sandbox) => SandboxPolicy {
            enabled: defaults.enabled,
            allowed_domains: override_sandbox.allowed_domains.clone(),
            env_passthrough: defaults.env_passthrough.clone(),
        },
        None => SandboxPolicy {
            enabled: defaults.enabled,
            allowed_domains: defaults.allowed_domains.clone(),
            env_passthrough: defaults.env_passthrough.clone(),
        },
    }
}
