//! Component model — the unit of deployment.
//!
//! A component is a named deployable unit with free-form properties and an
//! ordered list of dependencies on other components in the same plan. The
//! update/delete decision is made upstream (by diffing desired vs. observed
//! state); by the time a component enters a plan it is immutable.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A named deployable unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ComponentSpec {
    pub name: String,
    /// Provider-facing component type (e.g. "container", "helm.v3").
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub component_type: String,
    /// Free-form properties passed through to the execution provider.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub properties: HashMap<String, String>,
    /// Names of components that must be brought up before this one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
}

impl ComponentSpec {
    /// Convenience constructor for a dependency-free component.
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }
}

/// Whether a planned component is being brought up or torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepAction {
    Update,
    Delete,
}

/// One component with its planned action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComponentStep {
    pub action: StepAction,
    pub component: ComponentSpec,
}

impl ComponentStep {
    pub fn update(component: ComponentSpec) -> Self {
        Self {
            action: StepAction::Update,
            component,
        }
    }

    pub fn delete(component: ComponentSpec) -> Self {
        Self {
            action: StepAction::Delete,
            component,
        }
    }
}

/// Execution outcome for a single component within a step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComponentResult {
    pub status: ResultStatus,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl ComponentResult {
    /// The seed value every component starts from before execution runs.
    pub fn untouched() -> Self {
        Self {
            status: ResultStatus::Untouched,
            message: String::new(),
        }
    }
}

/// Per-component execution status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    /// Execution has not reached this component (or short-circuited first).
    Untouched,
    Updated,
    Deleted,
    Failed,
}
