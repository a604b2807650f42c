//! Deployment plan builder.
//!
//! A plan is an ordered sequence of steps, each a batch of component actions
//! destined for one target/role pair. The ordering invariant: an Update
//! component may only appear in a step once all of its dependencies appear
//! as Updates in the same or an earlier step. Teardown reverses that order —
//! components come down opposite to the order they went up.
//!
//! All operations here are pure and total. A component referencing a
//! dependency that exists nowhere in the plan is not an error at this layer;
//! it is simply never appendable, and the upstream plan constructor reports
//! the unplaceable component.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::component::{ComponentResult, ComponentSpec, ComponentStep, StepAction};

/// One batch of component actions for a single target/role pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DeploymentStep {
    pub target: String,
    pub role: String,
    /// Set on the first step emitted for a target, so providers can run
    /// one-time setup.
    pub is_first: bool,
    pub components: Vec<ComponentStep>,
}

impl DeploymentStep {
    /// All component specs in this step, in order.
    pub fn components(&self) -> Vec<ComponentSpec> {
        self.components.iter().map(|c| c.component.clone()).collect()
    }

    /// Component specs with an Update action, in order.
    pub fn updated_components(&self) -> Vec<ComponentSpec> {
        self.updated_component_steps()
            .into_iter()
            .map(|c| c.component)
            .collect()
    }

    /// Component specs with a Delete action, in order.
    pub fn deleted_components(&self) -> Vec<ComponentSpec> {
        self.components
            .iter()
            .filter(|c| c.action == StepAction::Delete)
            .map(|c| c.component.clone())
            .collect()
    }

    /// Component steps with an Update action, in order.
    pub fn updated_component_steps(&self) -> Vec<ComponentStep> {
        self.components
            .iter()
            .filter(|c| c.action == StepAction::Update)
            .cloned()
            .collect()
    }

    /// Seed a result map with every component marked untouched.
    ///
    /// Guarantees each component has a result even if execution
    /// short-circuits partway through the step.
    pub fn prepare_result_map(&self) -> HashMap<String, ComponentResult> {
        self.components
            .iter()
            .map(|c| (c.component.name.clone(), ComponentResult::untouched()))
            .collect()
    }
}

/// An ordered, dependency-respecting execution plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DeploymentPlan {
    pub steps: Vec<DeploymentStep>,
}

impl DeploymentPlan {
    /// The most recent step for the given target/role pair, scanning from
    /// the end. `None` when no step matches.
    ///
    /// Plan construction uses this to decide whether a new component can be
    /// merged into an existing trailing step for the same target/role or
    /// must start a new step, so the most-recent-match contract directly
    /// affects batching and execution order.
    pub fn find_last_target_role(&self, target: &str, role: &str) -> Option<usize> {
        self.steps
            .iter()
            .rposition(|s| s.role == role && s.target == target)
    }

    /// True iff every dependency of `component` is present as an Update
    /// action in a step strictly before `step_index`.
    ///
    /// A component with no dependencies is always appendable. A component
    /// whose dependency exists nowhere in the plan is never appendable —
    /// the caller detects that as a "could not place component" condition.
    pub fn can_append_to_step(&self, step_index: usize, component: &ComponentSpec) -> bool {
        component.dependencies.iter().all(|dep| {
            self.steps[..step_index].iter().any(|step| {
                step.components
                    .iter()
                    .any(|c| c.component.name == *dep && c.action == StepAction::Update)
            })
        })
    }

    /// Produce a teardown-safe reordering of this plan.
    ///
    /// Update-only steps keep their relative order and are emitted first.
    /// All-delete steps are held back on a stack. Mixed steps are split into
    /// an update step (original component order, emitted in place) and a
    /// delete step (components reversed, pushed on the stack). The stack is
    /// then drained in reverse push order, so the deletions derived from the
    /// last original step run first — components are torn down in the
    /// opposite order they were brought up.
    pub fn revised_for_deletion(&self) -> DeploymentPlan {
        let mut steps = Vec::new();
        let mut deleted_steps = Vec::new();

        for step in &self.steps {
            let deleted = step.deleted_components();
            if deleted.is_empty() {
                steps.push(step.clone());
            } else if deleted.len() == step.components.len() {
                deleted_steps.push(step.clone());
            } else {
                steps.push(make_update_step(step));
                deleted_steps.push(make_reversed_deletion_step(step));
            }
        }
        steps.extend(deleted_steps.into_iter().rev());

        DeploymentPlan { steps }
    }
}

/// A copy of `step` retaining only Update actions, in original order.
fn make_update_step(step: &DeploymentStep) -> DeploymentStep {
    DeploymentStep {
        target: step.target.clone(),
        role: step.role.clone(),
        is_first: step.is_first,
        components: step.updated_component_steps(),
    }
}

/// A copy of `step` retaining only Delete actions, in reverse order.
fn make_reversed_deletion_step(step: &DeploymentStep) -> DeploymentStep {
    DeploymentStep {
        target: step.target.clone(),
        role: step.role.clone(),
        is_first: step.is_first,
        components: step
            .components
            .iter()
            .rev()
            .filter(|c| c.action == StepAction::Delete)
            .cloned()
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(name: &str, deps: &[&str]) -> ComponentSpec {
        ComponentSpec {
            name: name.to_string(),
            dependencies: deps.iter().map(|d| d.to_string()).collect(),
            ..ComponentSpec::default()
        }
    }

    fn step(target: &str, role: &str, components: Vec<ComponentStep>) -> DeploymentStep {
        DeploymentStep {
            target: target.to_string(),
            role: role.to_string(),
            is_first: false,
            components,
        }
    }

    #[test]
    fn find_last_target_role_on_empty_plan() {
        let plan = DeploymentPlan::default();
        assert_eq!(plan.find_last_target_role("t1", "worker"), None);
    }

    #[test]
    fn find_last_target_role_returns_most_recent_match() {
        let plan = DeploymentPlan {
            steps: vec![
                step("t1", "worker", vec![]),
                step("t2", "worker", vec![]),
                step("t1", "worker", vec![]),
                step("t1", "gateway", vec![]),
            ],
        };
        assert_eq!(plan.find_last_target_role("t1", "worker"), Some(2));
        assert_eq!(plan.find_last_target_role("t2", "worker"), Some(1));
        assert_eq!(plan.find_last_target_role("t1", "gateway"), Some(3));
        assert_eq!(plan.find_last_target_role("t3", "worker"), None);
    }

    #[test]
    fn dependency_free_component_always_appendable() {
        let plan = DeploymentPlan {
            steps: vec![step("t1", "worker", vec![])],
        };
        assert!(plan.can_append_to_step(0, &component("solo", &[])));
    }

    #[test]
    fn append_requires_dependency_in_an_earlier_step() {
        // X depends on Y; Y updates in step 0, X goes into step 1.
        let plan = DeploymentPlan {
            steps: vec![
                step(
                    "t1",
                    "worker",
                    vec![ComponentStep::update(component("Y", &[]))],
                ),
                step("t1", "worker", vec![]),
            ],
        };
        let x = component("X", &["Y"]);
        assert!(plan.can_append_to_step(1, &x));
        // The dependency window is strictly before the step: a dependency
        // in the step itself does not qualify.
        assert!(!plan.can_append_to_step(0, &x));

        // Y only present as a Delete does not satisfy the dependency.
        let plan = DeploymentPlan {
            steps: vec![
                step(
                    "t1",
                    "worker",
                    vec![ComponentStep::delete(component("Y", &[]))],
                ),
                step("t1", "worker", vec![]),
            ],
        };
        assert!(!plan.can_append_to_step(1, &x));
    }

    #[test]
    fn append_with_unresolvable_dependency_is_never_true() {
        let plan = DeploymentPlan {
            steps: vec![
                step(
                    "t1",
                    "worker",
                    vec![ComponentStep::update(component("Y", &[]))],
                ),
                step("t1", "worker", vec![]),
            ],
        };
        assert!(!plan.can_append_to_step(1, &component("X", &["ghost"])));
    }

    #[test]
    fn dependency_in_a_later_step_does_not_count() {
        let plan = DeploymentPlan {
            steps: vec![
                step("t1", "worker", vec![]),
                step(
                    "t1",
                    "worker",
                    vec![ComponentStep::update(component("Y", &[]))],
                ),
            ],
        };
        assert!(!plan.can_append_to_step(1, &component("X", &["Y"])));
    }

    #[test]
    fn revised_for_deletion_is_identity_without_deletes() {
        let plan = DeploymentPlan {
            steps: vec![
                step(
                    "t1",
                    "worker",
                    vec![
                        ComponentStep::update(component("a", &[])),
                        ComponentStep::update(component("b", &[])),
                    ],
                ),
                step(
                    "t2",
                    "worker",
                    vec![ComponentStep::update(component("c", &[]))],
                ),
            ],
        };
        assert_eq!(plan.revised_for_deletion(), plan);
    }

    #[test]
    fn revised_for_deletion_reverses_all_delete_steps() {
        let plan = DeploymentPlan {
            steps: vec![
                step(
                    "t1",
                    "worker",
                    vec![
                        ComponentStep::delete(component("a", &[])),
                        ComponentStep::delete(component("b", &[])),
                    ],
                ),
                step(
                    "t2",
                    "worker",
                    vec![ComponentStep::delete(component("c", &[]))],
                ),
            ],
        };
        let revised = plan.revised_for_deletion();
        // Step order reversed across all-delete steps...
        assert_eq!(revised.steps[0].target, "t2");
        assert_eq!(revised.steps[1].target, "t1");
        // ...but component order within an unsplit step is untouched.
        assert_eq!(
            revised.steps[1]
                .components
                .iter()
                .map(|c| c.component.name.as_str())
                .collect::<Vec<_>>(),
            vec!["a", "b"]
        );
    }

    #[test]
    fn revised_for_deletion_splits_mixed_step() {
        // [Delete(A), Update(B), Delete(C)] for one target/role pair.
        let plan = DeploymentPlan {
            steps: vec![step(
                "T",
                "R",
                vec![
                    ComponentStep::delete(component("A", &[])),
                    ComponentStep::update(component("B", &[])),
                    ComponentStep::delete(component("C", &[])),
                ],
            )],
        };
        let revised = plan.revised_for_deletion();
        assert_eq!(revised.steps.len(), 2);

        let update_step = &revised.steps[0];
        assert_eq!(update_step.target, "T");
        assert_eq!(update_step.role, "R");
        assert_eq!(
            update_step
                .components
                .iter()
                .map(|c| c.component.name.as_str())
                .collect::<Vec<_>>(),
            vec!["B"]
        );

        let delete_step = &revised.steps[1];
        assert_eq!(delete_step.target, "T");
        assert_eq!(
            delete_step
                .components
                .iter()
                .map(|c| c.component.name.as_str())
                .collect::<Vec<_>>(),
            vec!["C", "A"]
        );
        assert!(delete_step
            .components
            .iter()
            .all(|c| c.action == StepAction::Delete));
    }

    #[test]
    fn revised_for_deletion_emits_updates_before_any_deletions() {
        let plan = DeploymentPlan {
            steps: vec![
                step(
                    "t1",
                    "worker",
                    vec![ComponentStep::delete(component("old", &[]))],
                ),
                step(
                    "t2",
                    "worker",
                    vec![ComponentStep::update(component("new", &[]))],
                ),
            ],
        };
        let revised = plan.revised_for_deletion();
        assert_eq!(revised.steps[0].target, "t2");
        assert_eq!(revised.steps[1].target, "t1");
    }

    #[test]
    fn prepare_result_map_covers_every_component() {
        let s = step(
            "t1",
            "worker",
            vec![
                ComponentStep::update(component("a", &[])),
                ComponentStep::delete(component("b", &[])),
            ],
        );
        let results = s.prepare_result_map();
        assert_eq!(results.len(), 2);
        assert_eq!(results["a"], ComponentResult::untouched());
        assert_eq!(results["b"], ComponentResult::untouched());
    }

    #[test]
    fn step_accessors_filter_by_action() {
        let s = step(
            "t1",
            "worker",
            vec![
                ComponentStep::update(component("a", &[])),
                ComponentStep::delete(component("b", &[])),
                ComponentStep::update(component("c", &[])),
            ],
        );
        assert_eq!(
            s.updated_components()
                .iter()
                .map(|c| c.name.as_str())
                .collect::<Vec<_>>(),
            vec!["a", "c"]
        );
        assert_eq!(
            s.deleted_components()
                .iter()
                .map(|c| c.name.as_str())
                .collect::<Vec<_>>(),
            vec!["b"]
        );
        assert_eq!(s.components().len(), 3);
    }
}
