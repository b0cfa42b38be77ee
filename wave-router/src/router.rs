//! ABOUTME: Router: picks a pipeline by scanning the manifest routing table

use crate::glob::glob_match;
use std::collections::HashMap;
use tracing::debug;
use wave_config::RoutingRule;

/// Evaluate `rules` against `input`/`labels`, scanning in priority-descending
/// order (stable on ties: rules of equal priority are tried in their
/// declaration order) and returning the first matching rule's pipeline name,
/// or `default_pipeline` if none match.
#[must_use]
pub fn route(rules: &[RoutingRule], input: &str, labels: &HashMap<String, String>, default_pipeline: &str) -> String {
    let mut ordered: Vec<&RoutingRule> = rules.iter().collect();
    ordered.sort_by_key(|r| std::cmp::Reverse(r.priority));

    for rule in ordered {
        if matches_pattern(&rule.pattern, input) && matches_labels(&rule.match_labels, labels) {
            debug!(pipeline = %rule.pipeline, priority = rule.priority, "routing rule matched");
            return rule.pipeline.clone();
        }
    }
    debug!(pipeline = default_pipeline, "no routing rule matched, using default pipeline");
    default_pipeline.to_string()
}

/// `pattern` matches `input` if it's empty (always matches), an exact
/// string match, a `*`/`?` glob, or (last resort) a case-insensitive
/// substring.
fn matches_pattern(pattern: &str, input: &str) -> bool {
    if pattern.is_empty() || pattern == input {
        return true;
    }
    if pattern.contains('*') || pattern.contains('?') {
        return glob_match(pattern, input);
    }
    input.to_lowercase().contains(&pattern.to_lowercase())
}

/// Every declared label must be present and match its rule pattern (exact or
/// glob; no substring fallback, since label values are identifiers, not
/// free text).
fn matches_labels(required: &HashMap<String, String>, actual: &HashMap<String, String>) -> bool {
    required.iter().all(|(key, pattern)| {
        actual
            .get(key)
            .is_some_and(|value| pattern == value || ((pattern.contains('*') || pattern.contains('?')) && glob_match(pattern, value)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(pipeline: &str, pattern: &str, priority: i32) -> RoutingRule {
        RoutingRule {
            pipeline: pipeline.to_string(),
            pattern: pattern.to_string(),
            match_labels: HashMap::new(),
            priority,
        }
    }

    #[test]
    fn higher_priority_rule_wins() {
        let rules = vec![rule("low", "*", 0), rule("high", "*", 10)];
        let labels = HashMap::new();
        assert_eq!(route(&rules, "anything", &labels, "default"), "high");
    }

    #[test]
    fn ties_are_resolved_by_declaration_order() {
        let rules = vec![rule("first", "*", 5), rule("second", "*", 5)];
        let labels = HashMap::new();
        assert_eq!(route(&rules, "anything", &labels, "default"), "first");
    }

    #[test]
    fn exact_pattern_matches_before_substring_would() {
        let rules = vec![rule("exact", "deploy", 0)];
        let labels = HashMap::new();
        assert_eq!(route(&rules, "deploy", &labels, "default"), "exact");
    }

    #[test]
    fn substring_fallback_is_case_insensitive() {
        let rules = vec![rule("matched", "Deploy", 0)];
        let labels = HashMap::new();
        assert_eq!(route(&rules, "please deploy now", &labels, "default"), "matched");
    }

    #[test]
    fn no_match_falls_back_to_default() {
        let rules = vec![rule("other", "release", 0)];
        let labels = HashMap::new();
        assert_eq!(route(&rules, "deploy", &labels, "default"), "default");
    }

    #[test]
    fn label_matching_requires_all_declared_labels() {
        let mut match_labels = HashMap::new();
        match_labels.insert("env".to_string(), "prod*".to_string());
        let rules = vec![RoutingRule {
            pipeline: "prod-deploy".to_string(),
            pattern: String::new(),
            match_labels,
            priority: 0,
        }];

        let mut labels = HashMap::new();
        labels.insert("env".to_string(), "production".to_string());
        assert_eq!(route(&rules, "x", &labels, "default"), "prod-deploy");

        labels.insert("env".to_string(), "staging".to_string());
        assert_eq!(route(&rules, "x", &labels, "default"), "default");
    }
}
