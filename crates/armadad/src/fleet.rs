//! fleet.toml parsing — desired state and jobs properties for standalone
//! runs.
//!
//! In a full deployment the control plane serves desired state over HTTP;
//! standalone mode seeds the in-memory control plane from a TOML file
//! instead, so a single process can exercise the whole poll → coordinate →
//! reconcile cycle.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use armada_core::{ComponentSpec, InstanceSpec, SolutionSpec, TargetSpec};

/// Top-level fleet.toml document.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FleetConfig {
    /// String-typed jobs properties (`poll.enabled`, `interval`, ...).
    #[serde(default)]
    pub jobs: HashMap<String, String>,
    #[serde(default)]
    pub instances: Vec<InstanceSpec>,
    #[serde(default)]
    pub targets: Vec<TargetSpec>,
    #[serde(default)]
    pub solutions: Vec<SolutionSeed>,
}

/// A solution plus the namespace it is registered under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolutionSeed {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub components: Vec<ComponentSpec>,
}

impl SolutionSeed {
    pub fn namespace(&self) -> &str {
        if self.namespace.is_empty() {
            "default"
        } else {
            &self.namespace
        }
    }

    pub fn spec(&self) -> SolutionSpec {
        SolutionSpec {
            name: self.name.clone(),
            components: self.components.clone(),
        }
    }
}

impl FleetConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: FleetConfig = toml::from_str(&content)?;
        Ok(config)
    }
}
