//! ABOUTME: Manifest and runtime configuration model
//! ABOUTME: TOML parsing + env overrides + validation

pub mod adapter_def;
pub mod manifest;
pub mod persona;
pub mod routing;
pub mod runtime;

pub use adapter_def::AdapterDef;
pub use manifest::{ConfigError, Manifest};
pub use persona::{Permissions, Persona, PersonaSandbox};
pub use routing::RoutingRule;
pub use runtime::{MetaPipelineConfig, RelayConfig, RuntimeConfig, SandboxDefaults};
