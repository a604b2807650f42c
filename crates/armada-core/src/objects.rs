//! Desired-state objects — instances, targets, solutions — and the
//! deployment request built from them.
//!
//! These mirror what the control-plane API serves. The orchestrator core
//! never stores them; it fetches current desired state per job and builds a
//! `DeploymentRequest` for the remote reconcile call.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::component::ComponentSpec;

/// How an instance picks its execution targets: by explicit name (wildcards
/// allowed) and/or by property selector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TargetSelector {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub selector: HashMap<String, String>,
}

/// A running deployment of a solution onto matched targets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct InstanceSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    /// Name of the solution this instance deploys.
    pub solution: String,
    #[serde(default)]
    pub target: TargetSelector,
}

/// An execution site components get deployed onto.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TargetSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    /// Matchable properties (os, location, capabilities, ...).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub properties: HashMap<String, String>,
    /// Components the target itself runs (its runtime payload).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<ComponentSpec>,
}

/// A named set of components to deploy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SolutionSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<ComponentSpec>,
}

/// Everything the remote reconcile call needs: the instance, its resolved
/// solution, and the candidate targets with component assignments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DeploymentRequest {
    pub instance: InstanceSpec,
    pub solution: SolutionSpec,
    pub solution_name: String,
    /// Candidate targets keyed by name.
    pub targets: HashMap<String, TargetSpec>,
    /// Component names assigned to each target.
    pub assignments: HashMap<String, Vec<String>>,
}

impl DeploymentRequest {
    /// Build the request for an instance job from its resolved desired state.
    ///
    /// Assignment evaluation (component constraints against target
    /// properties) is an external validation concern; every candidate target
    /// is assigned every solution component here.
    pub fn for_instance(
        instance: &InstanceSpec,
        solution: &SolutionSpec,
        targets: &[TargetSpec],
    ) -> Self {
        let mut instance = instance.clone();
        if instance.namespace.is_empty() {
            instance.namespace = "default".to_string();
        }

        let component_names: Vec<String> =
            solution.components.iter().map(|c| c.name.clone()).collect();
        let target_map: HashMap<String, TargetSpec> = targets
            .iter()
            .map(|t| (t.name.clone(), t.clone()))
            .collect();
        let assignments = target_map
            .keys()
            .map(|name| (name.clone(), component_names.clone()))
            .collect();

        Self {
            instance,
            solution: solution.clone(),
            solution_name: solution.name.clone(),
            targets: target_map,
            assignments,
        }
    }

    /// Build the request that reconciles a target's own runtime components.
    ///
    /// Synthesizes a single-target deployment named `target-runtime-<name>`
    /// whose solution is the target's component list.
    pub fn for_target(target: &TargetSpec) -> Self {
        let key = format!("target-runtime-{}", target.name);
        let namespace = if target.namespace.is_empty() {
            "default".to_string()
        } else {
            target.namespace.clone()
        };

        let solution = SolutionSpec {
            name: key.clone(),
            components: target.components.clone(),
        };
        let instance = InstanceSpec {
            name: key.clone(),
            namespace,
            solution: key.clone(),
            target: TargetSelector {
                name: target.name.clone(),
                selector: HashMap::new(),
            },
        };

        DeploymentRequest::for_instance(&instance, &solution, std::slice::from_ref(target))
    }
}

/// Targets an instance's selector matches, sorted by name for deterministic
/// ordering.
///
/// An explicit name (wildcards `*` and `%` allowed) and a property selector
/// are independent ways in; a target matching either is a candidate. A
/// selector matches only when every key/value pair matches the target's
/// properties.
pub fn match_targets(instance: &InstanceSpec, targets: &[TargetSpec]) -> Vec<TargetSpec> {
    let mut matched: HashMap<&str, &TargetSpec> = HashMap::new();

    if !instance.target.name.is_empty() {
        for t in targets {
            if match_pattern(&instance.target.name, &t.name) {
                matched.insert(&t.name, t);
            }
        }
    }

    if !instance.target.selector.is_empty() {
        for t in targets {
            let full_match = instance
                .target
                .selector
                .iter()
                .all(|(k, v)| t.properties.get(k).is_some_and(|tv| match_pattern(v, tv)));
            if full_match {
                matched.insert(&t.name, t);
            }
        }
    }

    let mut result: Vec<TargetSpec> = matched.into_values().cloned().collect();
    result.sort_by(|a, b| a.name.cmp(&b.name));
    result
}

/// Exact match, unless the pattern carries `*` (any run) or `%` (any single
/// character) wildcards.
fn match_pattern(pattern: &str, value: &str) -> bool {
    if pattern.contains('*') || pattern.contains('%') {
        let escaped = regex::escape(pattern).replace(r"\*", ".*").replace('%', ".");
        match regex::Regex::new(&format!("^{escaped}$")) {
            Ok(re) => re.is_match(value),
            Err(_) => false,
        }
    } else {
        pattern == value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(name: &str, props: &[(&str, &str)]) -> TargetSpec {
        TargetSpec {
            name: name.to_string(),
            properties: props
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..TargetSpec::default()
        }
    }

    fn instance_selecting(name: &str, selector: &[(&str, &str)]) -> InstanceSpec {
        InstanceSpec {
            name: "inst".into(),
            solution: "sol".into(),
            target: TargetSelector {
                name: name.to_string(),
                selector: selector
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            },
            ..InstanceSpec::default()
        }
    }

    #[test]
    fn match_by_explicit_name() {
        let targets = vec![target("edge-1", &[]), target("edge-2", &[])];
        let matched = match_targets(&instance_selecting("edge-1", &[]), &targets);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].name, "edge-1");
    }

    #[test]
    fn match_by_name_wildcard() {
        let targets = vec![
            target("edge-1", &[]),
            target("edge-2", &[]),
            target("cloud-1", &[]),
        ];
        let matched = match_targets(&instance_selecting("edge-*", &[]), &targets);
        assert_eq!(matched.len(), 2);
        assert_eq!(matched[0].name, "edge-1");
        assert_eq!(matched[1].name, "edge-2");
    }

    #[test]
    fn match_by_selector_requires_all_pairs() {
        let targets = vec![
            target("a", &[("os", "linux"), ("gpu", "true")]),
            target("b", &[("os", "linux")]),
        ];
        let matched = match_targets(
            &instance_selecting("", &[("os", "linux"), ("gpu", "true")]),
            &targets,
        );
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].name, "a");
    }

    #[test]
    fn name_and_selector_union_without_duplicates() {
        let targets = vec![target("a", &[("os", "linux")]), target("b", &[])];
        let matched = match_targets(&instance_selecting("a", &[("os", "linux")]), &targets);
        assert_eq!(matched.len(), 1);
    }

    #[test]
    fn no_selector_matches_nothing() {
        let targets = vec![target("a", &[])];
        assert!(match_targets(&instance_selecting("", &[]), &targets).is_empty());
    }

    #[test]
    fn for_instance_assigns_all_components_to_each_target() {
        let solution = SolutionSpec {
            name: "sol".into(),
            components: vec![ComponentSpec::named("web"), ComponentSpec::named("db")],
        };
        let instance = instance_selecting("edge-*", &[]);
        let targets = vec![target("edge-1", &[]), target("edge-2", &[])];

        let req = DeploymentRequest::for_instance(&instance, &solution, &targets);
        assert_eq!(req.solution_name, "sol");
        assert_eq!(req.instance.namespace, "default");
        assert_eq!(req.targets.len(), 2);
        assert_eq!(req.assignments["edge-1"], vec!["web", "db"]);
        assert_eq!(req.assignments["edge-2"], vec!["web", "db"]);
    }

    #[test]
    fn for_target_synthesizes_runtime_deployment() {
        let mut t = target("edge-1", &[]);
        t.components = vec![ComponentSpec::named("agent")];

        let req = DeploymentRequest::for_target(&t);
        assert_eq!(req.instance.name, "target-runtime-edge-1");
        assert_eq!(req.solution.name, "target-runtime-edge-1");
        assert_eq!(req.instance.namespace, "default");
        assert_eq!(req.solution.components.len(), 1);
        assert!(req.targets.contains_key("edge-1"));
        assert_eq!(req.assignments["edge-1"], vec!["agent"]);
    }

    #[test]
    fn pattern_wildcards() {
        assert!(match_pattern("edge-*", "edge-anything"));
        assert!(match_pattern("edge-%", "edge-1"));
        assert!(!match_pattern("edge-%", "edge-10"));
        assert!(!match_pattern("edge", "edge-1"));
        assert!(match_pattern("edge", "edge"));
    }
}
