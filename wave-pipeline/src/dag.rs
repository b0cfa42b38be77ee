//! ABOUTME: DAG Validator: unique ids, dependency resolution, cycle detection, topological sort

use crate::model::Pipeline;
use crate::step::Step;
use std::collections::{HashMap, HashSet, VecDeque};
use wave_core::{Result, ValidationKind, WaveError};

/// Structural validation: unique non-empty ids, every dependency resolves,
/// no cycles (a self-reference counts as a cycle). Does not check `kind` or
/// meta-pipeline semantic rules; see `validate_kind` and
/// `wave_pipeline::meta` for those.
pub fn validate_dag(pipeline: &Pipeline) -> Result<()> {
    let mut seen = HashSet::new();
    for step in &pipeline.steps {
        if step.id.is_empty() {
            return Err(WaveError::Validation {
                kind: ValidationKind::DuplicateId,
                message: "step id must not be empty".to_string(),
            });
        }
        if !seen.insert(step.id.as_str()) {
            return Err(WaveError::Validation {
                kind: ValidationKind::DuplicateId,
                message: format!("duplicate step id: {}", step.id),
            });
        }
    }

    let ids: HashSet<&str> = pipeline.steps.iter().map(|s| s.id.as_str()).collect();
    for step in &pipeline.steps {
        for dep in &step.dependencies {
            if dep == &step.id {
                return Err(WaveError::Validation {
                    kind: ValidationKind::Cycle,
                    message: format!("step '{}' depends on itself", step.id),
                });
            }
            if !ids.contains(dep.as_str()) {
                return Err(WaveError::Validation {
                    kind: ValidationKind::MissingDependency,
                    message: format!("step '{}' depends on unknown step '{dep}'", step.id),
                });
            }
        }
    }

    // A successful topological sort is itself the cycle check.
    topological_sort(pipeline)?;
    Ok(())
}

/// Produce a stable linearization of `pipeline.steps`: among ready steps
/// (in-degree zero), emission order equals declaration order (invariant 2).
/// Uses Kahn's algorithm with a FIFO ready-queue, not a stack, specifically
/// to preserve that stability.
pub fn topological_sort(pipeline: &Pipeline) -> Result<Vec<Step>> {
    let steps = &pipeline.steps;
    let index_of: HashMap<&str, usize> = steps
        .iter()
        .enumerate()
        .map(|(i, s)| (s.id.as_str(), i))
        .collect();

    let mut in_degree: Vec<usize> = vec![0; steps.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); steps.len()];

    for (i, step) in steps.iter().enumerate() {
        in_degree[i] = step.dependencies.len();
        for dep in &step.dependencies {
            if let Some(&dep_idx) = index_of.get(dep.as_str()) {
                dependents[dep_idx].push(i);
            } else {
                return Err(WaveError::Validation {
                    kind: ValidationKind::MissingDependency,
                    message: format!("step '{}' depends on unknown step '{dep}'", step.id),
                });
            }
        }
    }

    // Ready queue seeded in declaration order, drained FIFO: ties resolve
    // by declaration order (invariant 2).
    let mut ready: VecDeque<usize> = (0..steps.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(steps.len());

    while let Some(i) = ready.pop_front() {
        order.push(i);
        for &dependent in &dependents[i] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.push_back(dependent);
            }
        }
    }

    if order.len() != steps.len() {
        return Err(WaveError::Validation {
            kind: ValidationKind::Cycle,
            message: "pipeline contains a dependency cycle".to_string(),
        });
    }

    Ok(order.into_iter().map(|i| steps[i].clone()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::Step;

    fn step(id: &str, deps: &[&str]) -> Step {
        Step {
            id: id.to_string(),
            dependencies: deps.iter().map(|d| d.to_string()).collect(),
            ..Step::default()
        }
    }

    #[test]
    fn linear_pipeline_sorts_in_dependency_order() {
        let pipeline = Pipeline {
            steps: vec![step("a", &[]), step("b", &["a"]), step("c", &["b"])],
            ..Pipeline::default()
        };
        validate_dag(&pipeline).unwrap();
        let order: Vec<&str> = topological_sort(&pipeline)
            .unwrap()
            .iter()
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn diamond_respects_partial_order() {
        let pipeline = Pipeline {
            steps: vec![
                step("a", &[]),
                step("b", &["a"]),
                step("c", &["a"]),
                step("d", &["b", "c"]),
            ],
            ..Pipeline::default()
        };
        let order: Vec<&str> = topological_sort(&pipeline)
            .unwrap()
            .iter()
            .map(|s| s.id.as_str())
            .collect();
        let pos = |id: &str| order.iter().position(|&x| x == id).unwrap();
        assert!(pos("a") < pos("b"));
        assert!(pos("a") < pos("c"));
        assert!(pos("b") < pos("d"));
        assert!(pos("c") < pos("d"));
    }

    #[test]
    fn cycle_is_rejected_without_emitting_a_partial_order() {
        let pipeline = Pipeline {
            steps: vec![step("a", &["c"]), step("b", &["a"]), step("c", &["b"])],
            ..Pipeline::default()
        };
        let err = validate_dag(&pipeline).unwrap_err();
        assert!(matches!(
            err,
            WaveError::Validation {
                kind: ValidationKind::Cycle,
                ..
            }
        ));
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let pipeline = Pipeline {
            steps: vec![step("a", &["a"])],
            ..Pipeline::default()
        };
        let err = validate_dag(&pipeline).unwrap_err();
        assert!(matches!(
            err,
            WaveError::Validation {
                kind: ValidationKind::Cycle,
                ..
            }
        ));
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let pipeline = Pipeline {
            steps: vec![step("a", &[]), step("a", &[])],
            ..Pipeline::default()
        };
        let err = validate_dag(&pipeline).unwrap_err();
        assert!(matches!(
            err,
            WaveError::Validation {
                kind: ValidationKind::DuplicateId,
                ..
            }
        ));
    }

    #[test]
    fn missing_dependency_is_rejected() {
        let pipeline = Pipeline {
            steps: vec![step("a", &["ghost"])],
            ..Pipeline::default()
        };
        let err = validate_dag(&pipeline).unwrap_err();
        assert!(matches!(
            err,
            WaveError::Validation {
                kind: ValidationKind::MissingDependency,
                ..
            }
        ));
    }

    #[test]
    fn ties_are_broken_by_declaration_order() {
        // b and c both become ready at the same time; b is declared first.
        let pipeline = Pipeline {
            steps: vec![step("a", &[]), step("b", &["a"]), step("c", &["a"])],
            ..Pipeline::default()
        };
        let order: Vec<&str> = topological_sort(&pipeline)
            .unwrap()
            .iter()
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }
}
