//! Integration tests for the Pipeline Executor and Matrix Executor.

use std::collections::HashMap;
use std::sync::Arc;

use wave_adapter::{Adapter, AdapterResult, MockAdapter};
use wave_config::{AdapterDef, Manifest, Persona, RuntimeConfig};
use wave_contracts::ContractValidator;
use wave_core::{Event, EventSink, InMemoryStateStore, NoopEventSink, RecordingEventSink, RunState, WaveError};
use wave_executor::skill::NoopSkillProvisioner;
use wave_executor::{PipelineExecutor, PipelineExecutorDeps};
use wave_pipeline::{
    ArtifactRef, ExecSpec, ExecType, MatrixStrategy, Memory, Pipeline, PipelineMetadata, Requires, Step,
};
use wave_relay::CompactionMonitor;
use wave_security::{DefaultInputSanitizer, RootedPathSanitizer};

fn manifest(workspace_root: &std::path::Path) -> Manifest {
    let mut personas = HashMap::new();
    personas.insert(
        "navigator".to_string(),
        Persona {
            name: "navigator".to_string(),
            adapter: "mock".to_string(),
            model: None,
            temperature: None,
            system_prompt_file: None,
            permissions: Default::default(),
            sandbox: None,
        },
    );
    let mut adapters = HashMap::new();
    adapters.insert(
        "mock".to_string(),
        AdapterDef {
            name: "mock".to_string(),
            binary: "mock".to_string(),
            mode: None,
            output_format: "text".to_string(),
        },
    );
    Manifest {
        personas,
        adapters,
        runtime: RuntimeConfig {
            workspace_root: workspace_root.display().to_string(),
            ..RuntimeConfig::default()
        },
    }
}

fn deps_with(
    workspace_root: &std::path::Path,
    adapter: Arc<dyn Adapter>,
    event_sink: Arc<dyn EventSink>,
) -> Arc<PipelineExecutorDeps> {
    let mut adapters: HashMap<String, Arc<dyn Adapter>> = HashMap::new();
    adapters.insert("mock".to_string(), adapter.clone());

    Arc::new(PipelineExecutorDeps {
        manifest: Arc::new(manifest(workspace_root)),
        adapters,
        input_sanitizer: Arc::new(DefaultInputSanitizer),
        path_sanitizer: Arc::new(RootedPathSanitizer),
        contract_validator: Arc::new(ContractValidator::new(Arc::new(RootedPathSanitizer))),
        skill_provisioner: Arc::new(NoopSkillProvisioner),
        compaction_monitor: Arc::new(CompactionMonitor::new(
            Default::default(),
            Arc::new(MockAdapter::new(|_cfg| Ok(AdapterResult::success("summary")))),
            "mock",
        )),
        event_sink,
        state_store: Arc::new(InMemoryStateStore::new()),
    })
}

fn plain_step(id: &str, deps: &[&str]) -> Step {
    Step {
        id: id.to_string(),
        persona: "navigator".to_string(),
        dependencies: deps.iter().map(|d| d.to_string()).collect(),
        exec: ExecSpec {
            exec_type: ExecType::Prompt,
            source: Some(format!("do {id}")),
            ..ExecSpec::default()
        },
        ..Step::default()
    }
}

fn pipeline(name: &str, steps: Vec<Step>) -> Pipeline {
    Pipeline {
        metadata: PipelineMetadata {
            name: name.to_string(),
            ..PipelineMetadata::default()
        },
        input: Default::default(),
        requires: Requires::default(),
        steps,
    }
}

// Scenario 1: linear pipeline a -> b -> c, every step completes.
#[tokio::test]
async fn linear_pipeline_completes_all_steps_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let adapter: Arc<dyn Adapter> = Arc::new(MockAdapter::new(|_cfg| Ok(AdapterResult::success(r#"{"ok":true}"#))));
    let sink = Arc::new(RecordingEventSink::new());
    let deps = deps_with(dir.path(), adapter, sink.clone());
    let executor = PipelineExecutor::new(deps);

    let p = pipeline(
        "linear",
        vec![plain_step("a", &[]), plain_step("b", &["a"]), plain_step("c", &["b"])],
    );

    let status = executor.execute(&p, None).await.unwrap();
    assert_eq!(status.state, RunState::Completed);
    assert_eq!(status.completed_steps, vec!["a", "b", "c"]);
    assert!(status.failed_steps.is_empty());

    let completed_events: Vec<_> = sink
        .events()
        .into_iter()
        .filter(|e| e.state == "completed")
        .collect();
    assert_eq!(completed_events.len(), 3);
}

// Scenario 2: diamond dependency ordering.
#[test]
fn diamond_topological_order_respects_all_dependency_edges() {
    let p = pipeline(
        "diamond",
        vec![
            plain_step("a", &[]),
            plain_step("b", &["a"]),
            plain_step("c", &["a"]),
            plain_step("d", &["b", "c"]),
        ],
    );
    let order = wave_pipeline::topological_sort(&p).unwrap();
    let pos = |id: &str| order.iter().position(|s| s.id == id).unwrap();
    assert!(pos("a") < pos("b"));
    assert!(pos("a") < pos("c"));
    assert!(pos("b") < pos("d"));
    assert!(pos("c") < pos("d"));
}

// Scenario 3: a cycle is rejected before any step ever runs.
#[tokio::test]
async fn cyclic_pipeline_is_rejected_with_no_step_events() {
    let dir = tempfile::tempdir().unwrap();
    let adapter: Arc<dyn Adapter> = Arc::new(MockAdapter::new(|_cfg| panic!("adapter should never run on a cyclic pipeline")));
    let sink = Arc::new(RecordingEventSink::new());
    let deps = deps_with(dir.path(), adapter, sink.clone());
    let executor = PipelineExecutor::new(deps);

    let p = pipeline(
        "cycle",
        vec![plain_step("a", &["c"]), plain_step("b", &["a"]), plain_step("c", &["b"])],
    );

    let err = executor.execute(&p, None).await.unwrap_err();
    assert!(matches!(
        err.source,
        WaveError::Validation { kind: wave_core::ValidationKind::Cycle, .. }
    ));
    assert!(sink.events().is_empty());
}

// Scenario 4: missing artifact injections from two different producers
// accumulate into a single error naming both.
#[tokio::test]
async fn missing_artifact_injections_accumulate_into_one_error() {
    let dir = tempfile::tempdir().unwrap();
    let adapter: Arc<dyn Adapter> = Arc::new(MockAdapter::new(|_cfg| Ok(AdapterResult::success(""))));
    let deps = deps_with(dir.path(), adapter, Arc::new(NoopEventSink));
    let executor = PipelineExecutor::new(deps);

    let mut c = plain_step("c", &["a", "b"]);
    c.memory = Memory {
        inject_artifacts: vec![
            ArtifactRef {
                step: "a".to_string(),
                artifact: "analysis".to_string(),
                as_name: "analysis.json".to_string(),
            },
            ArtifactRef {
                step: "b".to_string(),
                artifact: "plan".to_string(),
                as_name: "plan.json".to_string(),
            },
        ],
        ..Memory::default()
    };

    let p = pipeline("missing-artifacts", vec![plain_step("a", &[]), plain_step("b", &[]), c]);

    let err = executor.execute(&p, None).await.unwrap_err();
    assert_eq!(err.step_id, "c");
    let WaveError::MissingArtifacts { missing } = err.source else {
        panic!("expected MissingArtifacts, got {:?}", err.source);
    };
    assert!(missing.iter().any(|m| m.contains("a:analysis")));
    assert!(missing.iter().any(|m| m.contains("b:plan")));
}

// Scenario 5: a matrix step with 5 items where worker index 2 fails reports
// a partial failure and emits `matrix_worker_failed` exactly once for it.
#[tokio::test]
async fn matrix_partial_failure_reports_aggregate_and_emits_one_worker_failed_event() {
    let dir = tempfile::tempdir().unwrap();
    let items_path = dir.path().join("items.json");
    std::fs::write(&items_path, "[0,1,2,3,4]").unwrap();

    let adapter: Arc<dyn Adapter> = Arc::new(MockAdapter::new(|cfg| {
        if cfg.prompt.contains("item 2") {
            Err(WaveError::Internal {
                message: "simulated failure for item 2".to_string(),
            })
        } else {
            Ok(AdapterResult::success("{}"))
        }
    }));
    let sink = Arc::new(RecordingEventSink::new());
    let deps = deps_with(dir.path(), adapter, sink.clone());
    let executor = PipelineExecutor::new(deps);

    let step = Step {
        id: "matrix_step".to_string(),
        persona: "navigator".to_string(),
        exec: ExecSpec {
            exec_type: ExecType::Prompt,
            source: Some("item {{item_index}}".to_string()),
            ..ExecSpec::default()
        },
        strategy: Some(MatrixStrategy {
            strategy_type: "matrix".to_string(),
            items_source: items_path.display().to_string(),
            item_key: None,
            max_concurrency: 0,
        }),
        ..Step::default()
    };

    let p = pipeline("matrix", vec![step]);
    let err = executor.execute(&p, None).await.unwrap_err();
    assert_eq!(err.step_id, "matrix_step");
    match err.source {
        WaveError::PartialFailure { failed, total, .. } => {
            assert_eq!(failed, 1);
            assert_eq!(total, 5);
        }
        other => panic!("expected PartialFailure, got {other:?}"),
    }

    let worker_failed: Vec<Event> = sink
        .events()
        .into_iter()
        .filter(|e| e.state == "matrix_worker_failed")
        .collect();
    assert_eq!(worker_failed.len(), 1);
    assert_eq!(worker_failed[0].step_id.as_deref(), Some("matrix_step/worker_2"));
}

// Scenario 5b: a matrix step over zero items succeeds trivially and emits
// a single `matrix_complete` event.
#[tokio::test]
async fn matrix_step_with_zero_items_succeeds_with_no_workers() {
    let dir = tempfile::tempdir().unwrap();
    let items_path = dir.path().join("items.json");
    std::fs::write(&items_path, "[]").unwrap();

    let adapter: Arc<dyn Adapter> = Arc::new(MockAdapter::new(|_cfg| panic!("no worker should run for zero items")));
    let sink = Arc::new(RecordingEventSink::new());
    let deps = deps_with(dir.path(), adapter, sink.clone());
    let executor = PipelineExecutor::new(deps);

    let step = Step {
        id: "matrix_step".to_string(),
        persona: "navigator".to_string(),
        exec: ExecSpec {
            exec_type: ExecType::Prompt,
            source: Some("item {{item_index}}".to_string()),
            ..ExecSpec::default()
        },
        strategy: Some(MatrixStrategy {
            strategy_type: "matrix".to_string(),
            items_source: items_path.display().to_string(),
            item_key: None,
            max_concurrency: 0,
        }),
        ..Step::default()
    };

    let status = executor.execute(&pipeline("matrix-empty", vec![step]), None).await.unwrap();
    assert_eq!(status.state, RunState::Completed);
    assert!(sink.events().iter().any(|e| e.state == "matrix_complete"));
}

// Concurrency Executor: step.concurrency > 1 spawns N identical workers of
// the same step and is fail-fast.
#[tokio::test]
async fn concurrency_step_spawns_n_identical_workers() {
    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let calls2 = calls.clone();
    let adapter: Arc<dyn Adapter> = Arc::new(MockAdapter::new(move |_cfg| {
        calls2.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(AdapterResult::success("ok"))
    }));
    let deps = deps_with(dir.path(), adapter, Arc::new(NoopEventSink));
    let executor = PipelineExecutor::new(deps);

    let step = Step {
        id: "fanned".to_string(),
        persona: "navigator".to_string(),
        exec: ExecSpec {
            exec_type: ExecType::Prompt,
            source: Some("work".to_string()),
            ..ExecSpec::default()
        },
        concurrency: 3,
        ..Step::default()
    };

    let status = executor.execute(&pipeline("concurrency", vec![step]), None).await.unwrap();
    assert_eq!(status.state, RunState::Completed);
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 3);
}

// Optional steps: a failure does not abort the run.
#[tokio::test]
async fn optional_step_failure_does_not_abort_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let adapter: Arc<dyn Adapter> = Arc::new(MockAdapter::new(|cfg| {
        if cfg.prompt.contains("flaky") {
            Err(WaveError::Internal { message: "boom".to_string() })
        } else {
            Ok(AdapterResult::success("ok"))
        }
    }));
    let deps = deps_with(dir.path(), adapter, Arc::new(NoopEventSink));
    let executor = PipelineExecutor::new(deps);

    let mut flaky = plain_step("flaky", &[]);
    flaky.optional = true;
    let p = pipeline("optional", vec![flaky, plain_step("after", &["flaky"])]);

    let status = executor.execute(&p, None).await.unwrap();
    assert_eq!(status.state, RunState::Completed);
    assert_eq!(status.completed_steps, vec!["flaky", "after"]);
}
