//! ABOUTME: Foundational types, error taxonomy, and external-collaborator traits for wave
//! ABOUTME: Every other crate in the workspace depends on this one; it depends on nothing wave-local

pub mod error;
pub mod event;
pub mod ids;
pub mod state_store;
pub mod status;

pub use error::{Result, StepError, ValidationKind, WaveError};
pub use event::{Event, EventSink, NoopEventSink, RecordingEventSink};
pub use state_store::{InMemoryStateStore, StateStore};
pub use status::{PipelineStatus, RunState, StepState};
