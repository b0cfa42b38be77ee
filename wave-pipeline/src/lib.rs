//! ABOUTME: Pipeline document model, YAML de/serialization, DAG validation, and template context

pub mod artifact;
pub mod contract;
pub mod dag;
pub mod exec_spec;
pub mod handover;
pub mod matrix;
pub mod model;
pub mod semantic;
pub mod step;
pub mod template_context;
pub mod workspace_spec;
pub mod yaml;

pub use artifact::ArtifactDef;
pub use contract::{ContractConfig, ContractType, OnFailure};
pub use dag::{topological_sort, validate_dag};
pub use exec_spec::{ExecSpec, ExecType};
pub use handover::{CompactionConfig, Handover};
pub use matrix::MatrixStrategy;
pub use model::{ArtifactRef, InputSpec, Memory, MemoryStrategy, Pipeline, PipelineMetadata, Requires};
pub use semantic::{validate_generated_pipeline, validate_kind};
pub use step::Step;
pub use template_context::TemplateContext;
pub use workspace_spec::{Mount, WorkspaceSpec, WorkspaceType};
pub use yaml::{parse_pipeline, serialize_pipeline};

use wave_core::Result;

/// Full validation pass: `kind` + DAG structure. Semantic rules for
/// generated pipelines are a separate, opt-in check
/// (`validate_generated_pipeline`), since they only apply to meta-pipeline
/// output, not to hand-authored pipelines.
pub fn validate(pipeline: &Pipeline) -> Result<()> {
    validate_kind(pipeline)?;
    validate_dag(pipeline)?;
    Ok(())
}
