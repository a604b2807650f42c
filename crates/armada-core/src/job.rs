//! Jobs, heartbeat leases, and success markers.
//!
//! A job is transient — it lives on the event bus and is never persisted.
//! Heartbeats and success markers are the durable traces a worker leaves in
//! the state store: a heartbeat says "someone is acting on this object right
//! now" (stale after a TTL, judged by readers), a success marker says "this
//! object last reconciled successfully at time T".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of object a job acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Instance,
    Target,
    Deployment,
}

impl ObjectKind {
    /// Key prefix for this kind's success markers.
    pub fn marker_prefix(&self) -> &'static str {
        match self {
            ObjectKind::Instance => "i_",
            ObjectKind::Target => "t_",
            ObjectKind::Deployment => "d_",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Instance => "instance",
            ObjectKind::Target => "target",
            ObjectKind::Deployment => "deployment",
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a job asks to happen to its object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobAction {
    Update,
    Delete,
}

/// A unit of reconciliation work carried on the `job` topic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobSpec {
    /// Object id (instance name, target name, or deployment id).
    pub id: String,
    pub action: JobAction,
    /// Optional scope qualifier within the namespace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Kind-specific payload; deployment jobs carry their serialized
    /// deployment request here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JobSpec {
    pub fn new(id: &str, action: JobAction) -> Self {
        Self {
            id: id.to_string(),
            action,
            scope: None,
            data: None,
        }
    }
}

/// A worker's lease on an object, persisted under `h_<job id>`.
///
/// Created or overwritten on every unit of work a worker begins, deleted
/// when the worker finishes a Delete job. Staleness (60s TTL) is evaluated
/// by readers — the store never expires entries itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HeartBeat {
    pub job_id: String,
    /// The action of the job holding the lease.
    pub action: JobAction,
    pub time: DateTime<Utc>,
}

/// Marker that an object reconciled successfully, persisted in the volatile
/// partition under the kind's prefix. Deleted with the object itself; an
/// absent or stale marker means the drift poller re-queues the object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LastSuccessTime {
    pub time: DateTime<Utc>,
}
