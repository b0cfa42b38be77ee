//! ABOUTME: Pipeline Executor: runs a validated pipeline's steps in topological order

use crate::concurrency::{run_concurrent, ConcurrentStep, StepTask};
use crate::matrix::{load_items, run_matrix, MatrixWorker};
use crate::skill::SkillProvisioner;
use crate::step_runner::{StepRunner, StepRunnerDeps};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use wave_adapter::Adapter;
use wave_artifacts::ArtifactTransport;
use wave_config::Manifest;
use wave_contracts::ContractValidator;
use wave_core::ids::make_run_id;
use wave_core::{Event, EventSink, PipelineStatus, Result, RunState, StateStore, StepError, WaveError};
use wave_pipeline::{validate, Pipeline, Step, TemplateContext};
use wave_relay::CompactionMonitor;
use wave_security::{InputSanitizer, PathSanitizer};
use wave_workspace::WorkspaceManager;

/// The shared (run-independent) external collaborators a `PipelineExecutor`
/// needs. Per-run state (the workspace manager and artifact transport) is
/// constructed fresh inside `execute`/`resume`.
pub struct PipelineExecutorDeps {
    pub manifest: Arc<Manifest>,
    pub adapters: HashMap<String, Arc<dyn Adapter>>,
    pub input_sanitizer: Arc<dyn InputSanitizer>,
    pub path_sanitizer: Arc<dyn PathSanitizer>,
    pub contract_validator: Arc<ContractValidator>,
    pub skill_provisioner: Arc<dyn SkillProvisioner>,
    pub compaction_monitor: Arc<CompactionMonitor>,
    pub event_sink: Arc<dyn EventSink>,
    pub state_store: Arc<dyn StateStore>,
}

pub struct PipelineExecutor {
    deps: Arc<PipelineExecutorDeps>,
}

impl PipelineExecutor {
    #[must_use]
    pub fn new(deps: Arc<PipelineExecutorDeps>) -> Self {
        Self { deps }
    }

    /// Validate and run `pipeline` end to end, seeding `{{ input }}` if
    /// `input` is given. Cleans and recreates the run workspace root before
    /// the first step. Returns the final status, or the first fatal
    /// `StepError`.
    pub async fn execute(
        &self,
        pipeline: &Pipeline,
        input: Option<String>,
    ) -> std::result::Result<PipelineStatus, StepError> {
        validate(pipeline).map_err(|e| StepError::new("<pipeline>", e))?;
        let order = wave_pipeline::topological_sort(pipeline).map_err(|e| StepError::new("<pipeline>", e))?;

        let run_id = make_run_id(&pipeline.metadata.name, self.deps.manifest.runtime.pipeline_id_hash_length);

        self.preflight(&run_id, pipeline).map_err(|e| StepError::new("<pipeline>", e))?;

        let run_root = std::path::Path::new(&self.deps.manifest.runtime.workspace_root).join(&run_id);
        if run_root.exists() {
            std::fs::remove_dir_all(&run_root).map_err(WaveError::from).map_err(|e| StepError::new("<pipeline>", e))?;
        }
        std::fs::create_dir_all(&run_root).map_err(WaveError::from).map_err(|e| StepError::new("<pipeline>", e))?;

        self.run_steps(pipeline, &run_id, &order, input).await
    }

    /// Resume a previously started run from `from_step` onward: everything
    /// before it in topological order is assumed already completed and its
    /// workspace directories/artifacts are expected to still exist under
    /// `run_id`. Does not clean the workspace root.
    pub async fn resume(
        &self,
        pipeline: &Pipeline,
        run_id: &str,
        from_step: &str,
        input: Option<String>,
    ) -> std::result::Result<PipelineStatus, StepError> {
        let order = wave_pipeline::topological_sort(pipeline).map_err(|e| StepError::new("<pipeline>", e))?;
        let start = order
            .iter()
            .position(|s| s.id == from_step)
            .ok_or_else(|| StepError::new(from_step, WaveError::UnknownWorkspaceRef { step_id: from_step.to_string() }))?;
        let remaining = order[start..].to_vec();
        self.run_steps(pipeline, run_id, &remaining, input).await
    }

    pub async fn get_status(&self, run_id: &str) -> Result<Option<PipelineStatus>> {
        self.deps.state_store.load_status(run_id).await
    }

    /// For every required tool/skill declared at pipeline scope, run a
    /// checker and emit a per-requirement event; a missing tool aborts the
    /// run before the first step. Skill availability itself is outside this
    /// crate's responsibility (provisioning is a named external
    /// collaborator) so skills are only announced, not gated.
    fn preflight(&self, run_id: &str, pipeline: &Pipeline) -> Result<()> {
        for tool in &pipeline.requires.tools {
            let found = which::which(tool).is_ok();
            self.deps.event_sink.emit(
                Event::new(run_id, if found { "requirement_met" } else { "requirement_missing" }, tool.clone())
                    .with_tool(tool.clone(), None),
            );
            if !found {
                return Err(WaveError::Configuration {
                    message: format!("required tool '{tool}' was not found on PATH"),
                });
            }
        }
        for skill in &pipeline.requires.skills {
            self.deps.event_sink.emit(Event::new(run_id, "requirement_met", format!("skill '{skill}' declared")));
        }
        Ok(())
    }

    async fn run_steps(
        &self,
        pipeline: &Pipeline,
        run_id: &str,
        steps: &[Step],
        input: Option<String>,
    ) -> std::result::Result<PipelineStatus, StepError> {
        let template_ctx = TemplateContext::new(run_id, pipeline.metadata.name.clone());
        if let Some(input) = input {
            template_ctx.set_custom_variable("input", input);
        }

        let workspace_manager = Arc::new(WorkspaceManager::new(
            self.deps.manifest.runtime.workspace_root.clone(),
            run_id.to_string(),
        ));
        let artifact_transport = Arc::new(ArtifactTransport::new(
            self.deps.path_sanitizer.clone(),
            self.deps.state_store.clone(),
        ));

        let runner_deps = Arc::new(StepRunnerDeps {
            manifest: self.deps.manifest.clone(),
            adapters: self.deps.adapters.clone(),
            input_sanitizer: self.deps.input_sanitizer.clone(),
            path_sanitizer: self.deps.path_sanitizer.clone(),
            contract_validator: self.deps.contract_validator.clone(),
            artifact_transport,
            workspace_manager: workspace_manager.clone(),
            skill_provisioner: self.deps.skill_provisioner.clone(),
            required_skills: pipeline.requires.skills.clone(),
            compaction_monitor: self.deps.compaction_monitor.clone(),
            event_sink: self.deps.event_sink.clone(),
            state_store: self.deps.state_store.clone(),
        });
        let step_runner = Arc::new(StepRunner::new(runner_deps));

        let mut status = PipelineStatus::new(run_id.to_string(), pipeline.metadata.name.clone());
        status.state = RunState::Running;
        let _ = self.deps.state_store.record_status(&status).await;

        let cancellation = CancellationToken::new();
        let result = self
            .run_sequential(run_id, steps, &step_runner, &template_ctx, &cancellation, &mut status)
            .await;

        workspace_manager.cleanup_worktrees();

        match result {
            Ok(()) => {
                status.state = RunState::Completed;
                status.completed_at = Some(chrono::Utc::now());
                let _ = self.deps.state_store.record_status(&status).await;
                Ok(status)
            }
            Err(e) => {
                status.state = RunState::Failed;
                status.completed_at = Some(chrono::Utc::now());
                status.failed_steps.push(e.step_id.clone());
                let _ = self.deps.state_store.record_status(&status).await;
                error!(step_id = %e.step_id, error = %e.source, "pipeline run failed");
                Err(e)
            }
        }
    }

    /// Iterate `steps` (already topologically sorted) one at a time.
    /// Parallelism lives inside a single step (matrix fan-out or
    /// `step.concurrency > 1`), never between steps.
    async fn run_sequential(
        &self,
        run_id: &str,
        steps: &[Step],
        step_runner: &Arc<StepRunner>,
        template_ctx: &TemplateContext,
        cancellation: &CancellationToken,
        status: &mut PipelineStatus,
    ) -> std::result::Result<(), StepError> {
        for step in steps {
            if cancellation.is_cancelled() || self.deps.state_store.is_cancelled(run_id).await {
                return Err(StepError::new(step.id.clone(), WaveError::Cancelled));
            }

            status.current_step = Some(step.id.clone());
            let _ = self.deps.state_store.record_status(status).await;

            let result = run_one_step(
                step_runner,
                run_id,
                step,
                template_ctx,
                cancellation,
                &self.deps.event_sink,
                self.deps.manifest.runtime.max_concurrent_workers,
            )
            .await;

            match result {
                Ok(()) => {
                    status.completed_steps.push(step.id.clone());
                }
                Err(e) if step.optional => {
                    warn!(step_id = %step.id, error = %e, "optional step failed, continuing");
                    status.completed_steps.push(step.id.clone());
                }
                Err(e) => {
                    return Err(StepError::new(step.id.clone(), e));
                }
            }
            let _ = self.deps.state_store.record_status(status).await;
        }
        Ok(())
    }
}

/// Run a single step, dispatching to the Matrix Executor (declared
/// `strategy`) or the Concurrency Executor (`step.concurrency > 1`, a
/// degenerate matrix of identical workers) when applicable.
async fn run_one_step(
    step_runner: &Arc<StepRunner>,
    run_id: &str,
    step: &Step,
    template_ctx: &TemplateContext,
    cancellation: &CancellationToken,
    event_sink: &Arc<dyn EventSink>,
    runtime_max_concurrent_workers: usize,
) -> Result<()> {
    if let Some(strategy) = &step.strategy {
        run_matrix_step(
            step_runner,
            run_id,
            step,
            strategy,
            template_ctx,
            cancellation,
            event_sink,
            runtime_max_concurrent_workers,
        )
        .await
    } else if step.concurrency > 1 {
        run_concurrency_step(step_runner, run_id, step, template_ctx, cancellation).await
    } else {
        step_runner
            .run(run_id, step, template_ctx, cancellation)
            .await
            .map_err(|e| e.source)
    }
}

/// `step.concurrency > 1` spawns N identical workers of the same step
/// (no per-item substitution), fail-fast via the Concurrency Executor.
async fn run_concurrency_step(
    step_runner: &Arc<StepRunner>,
    run_id: &str,
    step: &Step,
    template_ctx: &TemplateContext,
    cancellation: &CancellationToken,
) -> Result<()> {
    let worker_ids: Vec<ConcurrentStep> = (0..step.concurrency)
        .map(|i| ConcurrentStep { id: format!("worker_{i}"), optional: false })
        .collect();

    let task: StepTask = {
        let step_runner = step_runner.clone();
        let run_id = run_id.to_string();
        let base_step = step.clone();
        let base_ctx = template_ctx.clone();
        Arc::new(move |worker_id: String, cancel: CancellationToken| {
            let step_runner = step_runner.clone();
            let run_id = run_id.clone();
            let mut worker_step = base_step.clone();
            worker_step.id = format!("{}/{}", base_step.id, worker_id);
            worker_step.concurrency = 1;
            let worker_ctx = base_ctx.with_step_id(worker_step.id.clone());
            Box::pin(async move {
                step_runner
                    .run(&run_id, &worker_step, &worker_ctx, &cancel)
                    .await
                    .map_err(|e| e.source)
            })
        })
    };

    run_concurrent(worker_ids, step.concurrency as usize, task).await
}

async fn run_matrix_step(
    step_runner: &Arc<StepRunner>,
    run_id: &str,
    step: &Step,
    strategy: &wave_pipeline::MatrixStrategy,
    template_ctx: &TemplateContext,
    cancellation: &CancellationToken,
    event_sink: &Arc<dyn EventSink>,
    runtime_max_concurrent_workers: usize,
) -> Result<()> {
    let source_path = template_ctx.resolve_placeholders(&strategy.items_source);
    let content = std::fs::read_to_string(&source_path).map_err(|e| WaveError::Validation {
        kind: wave_core::ValidationKind::InvalidKind,
        message: format!("failed to read matrix items_source '{source_path}': {e}"),
    })?;
    let items = load_items(&content, strategy.item_key.as_deref())?;
    if items.is_empty() {
        info!(step_id = %step.id, "matrix strategy resolved zero items, reporting success with zero workers");
        event_sink.emit(Event::new(run_id, "matrix_complete", "zero items, nothing to run").with_step(step.id.clone()));
        return Ok(());
    }

    let step_cap = if strategy.max_concurrency == 0 {
        items.len()
    } else {
        strategy.max_concurrency
    };
    let max_concurrency = items.len().min(step_cap).min(runtime_max_concurrent_workers.max(1));

    let worker: MatrixWorker = {
        let step_runner = step_runner.clone();
        let run_id = run_id.to_string();
        let base_step = step.clone();
        let base_ctx = template_ctx.clone();
        let cancellation = cancellation.clone();
        let event_sink = event_sink.clone();
        let base_step_id = step.id.clone();
        Arc::new(move |index: usize, item: serde_json::Value| {
            let step_runner = step_runner.clone();
            let run_id = run_id.clone();
            let mut item_step = base_step.clone();
            item_step.id = format!("{}/worker_{}", base_step.id, index);
            item_step.strategy = None;
            let item_ctx = base_ctx.with_step_id(item_step.id.clone());
            item_ctx.set_custom_variable("item", item.to_string());
            item_ctx.set_custom_variable("task", item.to_string());
            item_ctx.set_custom_variable("item_index", index.to_string());
            let cancellation = cancellation.clone();
            let event_sink = event_sink.clone();
            let run_id_for_event = run_id.clone();
            let base_step_id = base_step_id.clone();
            Box::pin(async move {
                let result = step_runner
                    .run_collecting_modified_files(&run_id, &item_step, &item_ctx, &cancellation)
                    .await
                    .map_err(|e| e.source);
                if let Err(e) = &result {
                    event_sink.emit(
                        Event::new(&run_id_for_event, "matrix_worker_failed", format!("worker {index} failed: {e}"))
                            .with_step(format!("{base_step_id}/worker_{index}")),
                    );
                }
                result
            })
        })
    };

    run_matrix(items, max_concurrency, worker).await
}
