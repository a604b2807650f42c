//! In-memory control plane.
//!
//! Holds desired state in process and records every reconcile invocation.
//! Backs unit tests and the standalone daemon; failure injection switches
//! let tests drive the coordinator's error paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use armada_core::{DeploymentRequest, InstanceSpec, SolutionSpec, TargetSpec};

use crate::client::{ClientError, ClientResult, ControlPlane};

/// One recorded `reconcile` invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileCall {
    pub request: DeploymentRequest,
    pub is_delete: bool,
}

/// Registry key: `{namespace}/{name}`.
fn key(namespace: &str, name: &str) -> String {
    let ns = if namespace.is_empty() { "default" } else { namespace };
    format!("{ns}/{name}")
}

/// In-memory desired-state registry with recorded reconciles.
#[derive(Default)]
pub struct MemoryControlPlane {
    instances: RwLock<HashMap<String, InstanceSpec>>,
    targets: RwLock<HashMap<String, TargetSpec>>,
    solutions: RwLock<HashMap<String, SolutionSpec>>,
    reconciles: RwLock<Vec<ReconcileCall>>,
    fail_reconcile: AtomicBool,
    fail_delete: AtomicBool,
}

impl MemoryControlPlane {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put_instance(&self, instance: InstanceSpec) {
        let k = key(&instance.namespace, &instance.name);
        self.instances.write().await.insert(k, instance);
    }

    pub async fn put_target(&self, target: TargetSpec) {
        let k = key(&target.namespace, &target.name);
        self.targets.write().await.insert(k, target);
    }

    pub async fn put_solution(&self, namespace: &str, solution: SolutionSpec) {
        let k = key(namespace, &solution.name);
        self.solutions.write().await.insert(k, solution);
    }

    /// Every reconcile call recorded so far, in order.
    pub async fn reconcile_calls(&self) -> Vec<ReconcileCall> {
        self.reconciles.read().await.clone()
    }

    /// Make subsequent `reconcile` calls fail.
    pub fn set_fail_reconcile(&self, fail: bool) {
        self.fail_reconcile.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent `delete_instance` / `delete_target` calls fail.
    pub fn set_fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }
}

/// Registry keys start with the namespace, so namespace filtering is a
/// prefix check; an empty namespace selects everything.
fn in_namespace(entry_key: &str, namespace: &str) -> bool {
    namespace.is_empty() || entry_key.starts_with(&format!("{namespace}/"))
}

#[async_trait]
impl ControlPlane for MemoryControlPlane {
    /// An empty namespace lists across all namespaces.
    async fn list_instances(&self, namespace: &str) -> ClientResult<Vec<InstanceSpec>> {
        let map = self.instances.read().await;
        let mut items: Vec<InstanceSpec> = map
            .iter()
            .filter(|(k, _)| in_namespace(k, namespace))
            .map(|(_, v)| v.clone())
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    /// An empty namespace lists across all namespaces.
    async fn list_targets(&self, namespace: &str) -> ClientResult<Vec<TargetSpec>> {
        let map = self.targets.read().await;
        let mut items: Vec<TargetSpec> = map
            .iter()
            .filter(|(k, _)| in_namespace(k, namespace))
            .map(|(_, v)| v.clone())
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    async fn get_instance(&self, namespace: &str, name: &str) -> ClientResult<InstanceSpec> {
        self.instances
            .read()
            .await
            .get(&key(namespace, name))
            .cloned()
            .ok_or_else(|| ClientError::NotFound {
                kind: "instance",
                name: name.to_string(),
            })
    }

    async fn get_solution(&self, namespace: &str, name: &str) -> ClientResult<SolutionSpec> {
        self.solutions
            .read()
            .await
            .get(&key(namespace, name))
            .cloned()
            .ok_or_else(|| ClientError::NotFound {
                kind: "solution",
                name: name.to_string(),
            })
    }

    async fn get_target(&self, namespace: &str, name: &str) -> ClientResult<TargetSpec> {
        self.targets
            .read()
            .await
            .get(&key(namespace, name))
            .cloned()
            .ok_or_else(|| ClientError::NotFound {
                kind: "target",
                name: name.to_string(),
            })
    }

    async fn reconcile(&self, request: &DeploymentRequest, is_delete: bool) -> ClientResult<()> {
        if self.fail_reconcile.load(Ordering::SeqCst) {
            return Err(ClientError::Remote("injected reconcile failure".into()));
        }
        debug!(instance = %request.instance.name, is_delete, "reconcile recorded");
        self.reconciles.write().await.push(ReconcileCall {
            request: request.clone(),
            is_delete,
        });
        Ok(())
    }

    async fn delete_instance(&self, namespace: &str, name: &str) -> ClientResult<()> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(ClientError::Remote("injected delete failure".into()));
        }
        self.instances
            .write()
            .await
            .remove(&key(namespace, name))
            .map(|_| ())
            .ok_or_else(|| ClientError::NotFound {
                kind: "instance",
                name: name.to_string(),
            })
    }

    async fn delete_target(&self, namespace: &str, name: &str) -> ClientResult<()> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(ClientError::Remote("injected delete failure".into()));
        }
        self.targets
            .write()
            .await
            .remove(&key(namespace, name))
            .map(|_| ())
            .ok_or_else(|| ClientError::NotFound {
                kind: "target",
                name: name.to_string(),
            })
    }
}
