//! ABOUTME: wave-security - input sanitization and path-traversal guards
//! ABOUTME: The real security module (sandboxing, domain allow-lists) lives outside this crate;
//! ABOUTME: these are the narrow interfaces the orchestrator consumes

pub mod input;
pub mod path;

pub use input::{DefaultInputSanitizer, InputSanitizer, SanitizeOutcome};
pub use path::{PathSanitizer, RootedPathSanitizer};
