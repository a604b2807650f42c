//! Control-plane client contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use armada_core::{DeploymentRequest, InstanceSpec, SolutionSpec, TargetSpec};

/// Result type alias for control-plane calls.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by a control-plane client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("remote reconcile failed: {0}")]
    Remote(String),
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound { .. })
    }
}

/// Optional credentials for the control-plane API, populated from the
/// string-typed `user` / `password` config keys when credential auth is
/// enabled.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl Credentials {
    pub fn is_empty(&self) -> bool {
        self.user.is_empty() && self.password.is_empty()
    }
}

/// The control-plane surface the orchestrator core consumes.
///
/// Implementations are expected to enforce their own call timeouts; the
/// core never cancels an in-flight call — a stuck call just lets the
/// caller's heartbeat lease expire so another worker can take over.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    async fn list_instances(&self, namespace: &str) -> ClientResult<Vec<InstanceSpec>>;

    async fn list_targets(&self, namespace: &str) -> ClientResult<Vec<TargetSpec>>;

    async fn get_instance(&self, namespace: &str, name: &str) -> ClientResult<InstanceSpec>;

    async fn get_solution(&self, namespace: &str, name: &str) -> ClientResult<SolutionSpec>;

    async fn get_target(&self, namespace: &str, name: &str) -> ClientResult<TargetSpec>;

    /// Drive the remote execution sites toward (or away from, when
    /// `is_delete`) the requested deployment. Idempotent at the remote
    /// boundary by contract.
    async fn reconcile(&self, request: &DeploymentRequest, is_delete: bool) -> ClientResult<()>;

    async fn delete_instance(&self, namespace: &str, name: &str) -> ClientResult<()>;

    async fn delete_target(&self, namespace: &str, name: &str) -> ClientResult<()>;
}
