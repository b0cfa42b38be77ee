//! ABOUTME: Step Runner, Matrix/Concurrency executors, Pipeline Executor, and Meta-Pipeline
//! ABOUTME: Executor - the workspace's orchestration core

pub mod concurrency;
pub mod matrix;
pub mod meta;
pub mod pipeline;
pub mod skill;
pub mod step_runner;

pub use concurrency::{run_concurrent, ConcurrentStep, StepTask};
pub use matrix::{load_items, run_matrix, MatrixWorker};
pub use meta::{MetaPipelineExecutor, MetaPipelineResult};
pub use pipeline::{PipelineExecutor, PipelineExecutorDeps};
pub use skill::{NoopSkillProvisioner, SkillProvisioner};
pub use step_runner::{StepRunner, StepRunnerDeps};
