//! ABOUTME: YAML de/serialization for the pipeline document

use crate::model::Pipeline;
use wave_core::{Result, WaveError};

/// Parse a pipeline document. Unknown top-level fields are ignored (structs
/// derive `Deserialize` without `deny_unknown_fields`); numeric booleans
/// (`1`/`0` in place of `true`/`false`) are rejected because every boolean
/// field is a genuine `bool`, which `serde_yaml` refuses to coerce from a
/// number.
pub fn parse_pipeline(yaml: &str) -> Result<Pipeline> {
    serde_yaml::from_str(yaml).map_err(|e| WaveError::Validation {
        kind: wave_core::ValidationKind::InvalidKind,
        message: format!("failed to parse pipeline YAML: {e}"),
    })
}

/// Serialize a pipeline back to YAML, preserving field/array order.
pub fn serialize_pipeline(pipeline: &Pipeline) -> Result<String> {
    serde_yaml::to_string(pipeline).map_err(|e| WaveError::Internal {
        message: format!("failed to serialize pipeline: {e}"),
    })
}
