//! ABOUTME: Error taxonomy for the wave orchestrator
//! ABOUTME: A single thiserror enum covering validation, resolution, execution, artifact,
//! ABOUTME: contract, matrix, meta-pipeline, and cancellation failures

use thiserror::Error;

/// Kinds of structural failure raised by the DAG validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationKind {
    DuplicateId,
    MissingDependency,
    Cycle,
    InvalidKind,
    SemanticRule,
}

impl std::fmt::Display for ValidationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::DuplicateId => "duplicate_id",
            Self::MissingDependency => "missing_dependency",
            Self::Cycle => "cycle",
            Self::InvalidKind => "invalid_kind",
            Self::SemanticRule => "semantic_rule",
        };
        write!(f, "{s}")
    }
}

/// Comprehensive error enum for all wave orchestration operations.
#[derive(Debug, Error)]
pub enum WaveError {
    #[error("validation error ({kind}): {message}")]
    Validation {
        kind: ValidationKind,
        message: String,
    },

    #[error("unknown persona: {name}")]
    UnknownPersona { name: String },

    #[error("unknown adapter: {name}")]
    UnknownAdapter { name: String },

    #[error("unknown workspace reference: step {step_id}")]
    UnknownWorkspaceRef { step_id: String },

    #[error("adapter invocation failed for step {step_id}: {message}")]
    AdapterInvocation { step_id: String, message: String },

    #[error("adapter reported a rate limit for step {step_id}: {message}")]
    AdapterRateLimit { step_id: String, message: String },

    #[error("missing artifacts: {}", .missing.join(", "))]
    MissingArtifacts { missing: Vec<String> },

    #[error("artifact path type mismatch at {path}: expected file, found directory")]
    ArtifactPathType { path: String },

    #[error("contract validation failed for step {step_id}: {message}")]
    ContractValidation { step_id: String, message: String },

    #[error("matrix partial failure: {failed} of {total} workers failed: {message}")]
    PartialFailure {
        failed: usize,
        total: usize,
        message: String,
    },

    #[error("matrix workers reported conflicting writes to: {}", .files.join(", "))]
    FileConflict { files: Vec<String> },

    #[error("meta-pipeline depth limit: current={current}, max={max}, call stack=[{stack}]. increase runtime.meta_pipeline.max_depth to proceed")]
    DepthLimit {
        current: u32,
        max: u32,
        stack: String,
    },

    #[error("meta-pipeline token limit exceeded: used={used}, limit={limit}")]
    TokenLimit { used: u64, limit: u64 },

    #[error("meta-pipeline step limit exceeded: used={used}, limit={limit}")]
    StepLimit { used: u32, limit: u32 },

    #[error("generated pipeline is invalid: {message}")]
    GeneratedPipelineInvalid { message: String },

    #[error("operation cancelled")]
    Cancelled,

    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("security violation: {message}")]
    Security { message: String },

    #[error("io error: {message}")]
    Io { message: String },

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl From<std::io::Error> for WaveError {
    fn from(e: std::io::Error) -> Self {
        Self::Io {
            message: e.to_string(),
        }
    }
}

/// A per-step error, carrying the failing step's id alongside the cause.
///
/// This is the shape returned from `PipelineExecutor::execute` on failure:
/// callers can always recover which step failed without parsing the error
/// message.
#[derive(Debug, Error)]
#[error("step '{step_id}' failed: {source}")]
pub struct StepError {
    pub step_id: String,
    #[source]
    pub source: WaveError,
}

impl StepError {
    pub fn new(step_id: impl Into<String>, source: WaveError) -> Self {
        Self {
            step_id: step_id.into(),
            source,
        }
    }
}

/// Convenience Result alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, WaveError>;
