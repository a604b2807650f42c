//! Storage unit and partition metadata.

use serde::{Deserialize, Serialize};

/// The store's unit of storage: an opaque JSON body under an id, stamped
/// with an opaque version token on every write.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateEntry {
    pub id: String,
    pub body: serde_json::Value,
    /// Assigned by the store on upsert. Callers may echo it back on a later
    /// upsert; whether a stale token is rejected is backend policy.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
}

impl StateEntry {
    /// An entry with no version token (a first write, or a caller that
    /// doesn't participate in optimistic concurrency).
    pub fn new(id: &str, body: serde_json::Value) -> Self {
        Self {
            id: id.to_string(),
            body,
            version: String::new(),
        }
    }
}

/// Whether records in a partition survive a store restart.
///
/// Success markers are volatile (losing one only causes an extra
/// reconcile); parked activations are persistent (losing one loses work).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Durability {
    Volatile,
    Persistent,
}

/// Multi-tenant separation metadata: a namespace plus a logical
/// group/resource/kind triple.
///
/// Reference backends use the partition only for key separation; richer
/// filtering semantics are a backend concern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Partition {
    pub namespace: String,
    pub group: String,
    pub resource: String,
    pub kind: String,
    pub durability: Durability,
}

impl Partition {
    pub fn volatile(namespace: &str, resource: &str, kind: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            group: "fleet.armada.dev".to_string(),
            resource: resource.to_string(),
            kind: kind.to_string(),
            durability: Durability::Volatile,
        }
    }

    pub fn persistent(namespace: &str, resource: &str, kind: &str) -> Self {
        Self {
            durability: Durability::Persistent,
            ..Self::volatile(namespace, resource, kind)
        }
    }

    /// Key prefix isolating this partition within a backend keyspace.
    ///
    /// The namespace is the innermost segment, so a partition with an empty
    /// namespace prefixes every namespace of the same triple — that is how
    /// pollers list fleet-wide.
    pub fn key_prefix(&self) -> String {
        let mut prefix = format!("{}/{}/{}/", self.group, self.resource, self.kind);
        if !self.namespace.is_empty() {
            prefix.push_str(&self.namespace);
            prefix.push('/');
        }
        prefix
    }

    /// Full backend key for an entry id. Reads and writes always land in a
    /// concrete namespace; an empty one falls back to `default`.
    pub fn key_for(&self, id: &str) -> String {
        if self.namespace.is_empty() {
            let mut scoped = self.clone();
            scoped.namespace = "default".to_string();
            return scoped.key_for(id);
        }
        format!("{}{id}", self.key_prefix())
    }
}
