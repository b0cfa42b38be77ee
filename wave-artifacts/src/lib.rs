//! ABOUTME: Artifact Transport component

pub mod transport;

pub use transport::{ArtifactLocation, ArtifactTransport};
