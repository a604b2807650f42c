//! Persisted record keys and partitions.
//!
//! Key prefixes are part of the shared-store contract between orchestrator
//! processes — every process must derive identical keys for the same
//! object, so all derivation lives here.

use std::time::Duration;

use armada_core::ObjectKind;
use armada_state::Partition;

/// A heartbeat older than this no longer counts as a live lease. Readers
/// judge staleness; the store never expires entries.
pub const LEASE_TTL: Duration = Duration::from_secs(60);

/// Lease key for a job: `h_<job id>`, or the target-runtime variant for
/// target jobs (a target's own reconcile runs under its runtime identity).
pub fn heartbeat_key(kind: ObjectKind, job_id: &str) -> String {
    match kind {
        ObjectKind::Target => format!("h_target-runtime-{job_id}"),
        _ => format!("h_{job_id}"),
    }
}

/// Success-marker key: `i_` / `t_` / `d_` prefix by object kind.
pub fn success_marker_key(kind: ObjectKind, id: &str) -> String {
    format!("{}{id}", kind.marker_prefix())
}

/// Parked-activation key: `sch_<campaign>-<activation>`.
pub fn activation_key(campaign: &str, activation: &str) -> String {
    format!("sch_{campaign}-{activation}")
}

/// Heartbeat leases — volatile; a lost lease only re-opens an object.
pub fn lease_partition(namespace: &str) -> Partition {
    Partition::volatile(namespace, "leases", "HeartBeat")
}

/// Success markers — volatile; a lost marker only costs a reconcile.
pub fn marker_partition(namespace: &str) -> Partition {
    Partition::volatile(namespace, "markers", "LastSuccessTime")
}

/// Parked activations — persistent; a lost activation loses work.
/// An empty namespace lists fleet-wide.
pub fn activation_partition(namespace: &str) -> Partition {
    Partition::persistent(namespace, "activations", "Activation")
}

/// Namespace fallback shared by events that omit it.
pub fn namespace_or_default(namespace: Option<&str>) -> &str {
    match namespace {
        Some(ns) if !ns.is_empty() => ns,
        _ => "default",
    }
}
