//! Property tests for the DAG validator's topological sort: declaration-order
//! tie-breaking must hold for any acyclic dependency graph.

use proptest::prelude::*;
use std::collections::HashMap;
use wave_pipeline::{topological_sort, validate_dag, Pipeline, Step};

/// Build a pipeline with `n` steps where step `i` may depend on any step
/// `j < i` (guaranteeing acyclicity by construction), driven by a bitmask
/// per step so proptest can shrink it.
fn build_acyclic_pipeline(masks: &[u32]) -> Pipeline {
    let ids: Vec<String> = (0..masks.len()).map(|i| format!("s{i}")).collect();
    let steps = masks
        .iter()
        .enumerate()
        .map(|(i, &mask)| {
            let dependencies = (0..i)
                .filter(|&j| (mask >> j) & 1 == 1)
                .map(|j| ids[j].clone())
                .collect();
            Step {
                id: ids[i].clone(),
                dependencies,
                ..Step::default()
            }
        })
        .collect();
    Pipeline {
        steps,
        ..Pipeline::default()
    }
}

proptest! {
    #[test]
    fn topo_sort_respects_all_dependencies(masks in prop::collection::vec(0u32..=0xFF, 1..10)) {
        let pipeline = build_acyclic_pipeline(&masks);
        validate_dag(&pipeline).unwrap();
        let order = topological_sort(&pipeline).unwrap();

        let index_of: HashMap<&str, usize> = order
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id.as_str(), i))
            .collect();

        for step in &order {
            for dep in &step.dependencies {
                prop_assert!(index_of[dep.as_str()] < index_of[step.id.as_str()]);
            }
        }
        prop_assert_eq!(order.len(), pipeline.steps.len());
    }
}
