//! ABOUTME: Compaction Monitor component

pub mod monitor;

pub use monitor::{should_compact, CompactionMonitor};
