//! ABOUTME: Semantic validation rules beyond plain DAG structure

use crate::dag::topological_sort;
use crate::model::{MemoryStrategy, Pipeline};
use wave_core::{Result, ValidationKind, WaveError};

/// `kind` must be `"WavePipeline"` or empty.
pub fn validate_kind(pipeline: &Pipeline) -> Result<()> {
    if !pipeline.has_valid_kind() {
        return Err(WaveError::Validation {
            kind: ValidationKind::InvalidKind,
            message: format!("unsupported pipeline kind: '{}'", pipeline.kind),
        });
    }
    Ok(())
}

/// Rules a *generated* (meta) pipeline must satisfy: the first
/// topologically-ordered step uses persona
/// `"navigator"`; every step declares a non-empty handover contract type;
/// every step's memory strategy is `"fresh"`.
pub fn validate_generated_pipeline(pipeline: &Pipeline) -> Result<()> {
    let order = topological_sort(pipeline)?;

    let first = order.first().ok_or_else(|| WaveError::Validation {
        kind: ValidationKind::SemanticRule,
        message: "generated pipeline has no steps".to_string(),
    })?;
    if first.persona != "navigator" {
        return Err(WaveError::Validation {
            kind: ValidationKind::SemanticRule,
            message: format!(
                "generated pipeline's first step ('{}') must use persona 'navigator', found '{}'",
                first.id, first.persona
            ),
        });
    }

    for step in &order {
        if !step.handover.contract.is_declared() {
            return Err(WaveError::Validation {
                kind: ValidationKind::SemanticRule,
                message: format!(
                    "generated pipeline step '{}' is missing a handover contract",
                    step.id
                ),
            });
        }
        if !matches!(step.memory.strategy, MemoryStrategy::Fresh) {
            return Err(WaveError::Validation {
                kind: ValidationKind::SemanticRule,
                message: format!(
                    "generated pipeline step '{}' must use memory.strategy = 'fresh'",
                    step.id
                ),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{ContractConfig, ContractType};
    use crate::handover::Handover;
    use crate::model::Memory;
    use crate::step::Step;

    fn navigator_step(id: &str, deps: &[&str]) -> Step {
        Step {
            id: id.to_string(),
            persona: "navigator".to_string(),
            dependencies: deps.iter().map(|d| d.to_string()).collect(),
            memory: Memory {
                strategy: MemoryStrategy::Fresh,
                ..Memory::default()
            },
            handover: Handover {
                contract: ContractConfig {
                    contract_type: ContractType::JsonSchema,
                    ..ContractConfig::default()
                },
                ..Handover::default()
            },
            ..Step::default()
        }
    }

    #[test]
    fn valid_generated_pipeline_passes() {
        let pipeline = Pipeline {
            steps: vec![navigator_step("plan", &[])],
            ..Pipeline::default()
        };
        assert!(validate_generated_pipeline(&pipeline).is_ok());
    }

    #[test]
    fn first_step_must_be_navigator() {
        let mut step = navigator_step("plan", &[]);
        step.persona = "researcher".to_string();
        let pipeline = Pipeline {
            steps: vec![step],
            ..Pipeline::default()
        };
        let err = validate_generated_pipeline(&pipeline).unwrap_err();
        assert!(matches!(
            err,
            WaveError::Validation {
                kind: ValidationKind::SemanticRule,
                ..
            }
        ));
    }

    #[test]
    fn every_step_requires_a_contract() {
        let mut step = navigator_step("plan", &[]);
        step.handover.contract = ContractConfig::default();
        let pipeline = Pipeline {
            steps: vec![step],
            ..Pipeline::default()
        };
        assert!(validate_generated_pipeline(&pipeline).is_err());
    }

    #[test]
    fn every_step_requires_fresh_memory() {
        let mut step = navigator_step("plan", &[]);
        step.memory.strategy = MemoryStrategy::Persistent;
        let pipeline = Pipeline {
            steps: vec![step],
            ..Pipeline::default()
        };
        assert!(validate_generated_pipeline(&pipeline).is_err());
    }
}
