//! In-memory state store.
//!
//! Last-write-wins: version tokens are assigned on every write but a
//! caller-supplied stale token is never rejected. Suits tests and
//! single-process runs where the coordinator's single-writer ownership
//! rules already prevent conflicting writers.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::store::StateStore;
use crate::types::{Durability, Partition, StateEntry};

/// Thread-safe in-memory store with volatile/persistent keyspaces.
///
/// Both keyspaces share the process lifetime; the split exists so code paths
/// and tests exercise the same partition routing as durable backends.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    volatile: Mutex<HashMap<String, StateEntry>>,
    persistent: Mutex<HashMap<String, StateEntry>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn keyspace(&self, durability: Durability) -> &Mutex<HashMap<String, StateEntry>> {
        match durability {
            Durability::Volatile => &self.volatile,
            Durability::Persistent => &self.persistent,
        }
    }
}

impl StateStore for MemoryStateStore {
    fn get(&self, id: &str, partition: &Partition) -> StateResult<StateEntry> {
        let map = self
            .keyspace(partition.durability)
            .lock()
            .map_err(|e| StateError::Storage(e.to_string()))?;
        map.get(&partition.key_for(id))
            .cloned()
            .ok_or_else(|| StateError::NotFound(id.to_string()))
    }

    fn upsert(&self, mut entry: StateEntry, partition: &Partition) -> StateResult<String> {
        let mut map = self
            .keyspace(partition.durability)
            .lock()
            .map_err(|e| StateError::Storage(e.to_string()))?;
        let key = partition.key_for(&entry.id);

        // Token advances from the stored entry; a supplied stale token is
        // accepted (last write wins).
        let next = match map.get(&key) {
            Some(stored) => stored.version.parse::<u64>().unwrap_or(0) + 1,
            None => 1,
        };
        entry.version = next.to_string();

        debug!(id = %entry.id, version = %entry.version, "state upsert");
        let version = entry.version.clone();
        map.insert(key, entry);
        Ok(version)
    }

    fn delete(&self, id: &str, partition: &Partition) -> StateResult<()> {
        let mut map = self
            .keyspace(partition.durability)
            .lock()
            .map_err(|e| StateError::Storage(e.to_string()))?;
        map.remove(&partition.key_for(id))
            .map(|_| ())
            .ok_or_else(|| StateError::NotFound(id.to_string()))
    }

    fn list(&self, partition: &Partition) -> StateResult<(Vec<StateEntry>, Option<String>)> {
        let map = self
            .keyspace(partition.durability)
            .lock()
            .map_err(|e| StateError::Storage(e.to_string()))?;
        let prefix = partition.key_prefix();
        let mut entries: Vec<StateEntry> = map
            .iter()
            .filter(|(k, _)| k.starts_with(&prefix))
            .map(|(_, v)| v.clone())
            .collect();
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok((entries, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn leases(ns: &str) -> Partition {
        Partition::volatile(ns, "leases", "HeartBeat")
    }

    #[test]
    fn get_missing_is_not_found() {
        let store = MemoryStateStore::new();
        let err = store.get("h_x", &leases("default")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn upsert_then_get_roundtrips_body() {
        let store = MemoryStateStore::new();
        let body = json!({"job_id": "foo", "action": "UPDATE"});
        store
            .upsert(StateEntry::new("h_foo", body.clone()), &leases("default"))
            .unwrap();

        let entry = store.get("h_foo", &leases("default")).unwrap();
        assert_eq!(entry.body, body);
        assert_eq!(entry.version, "1");
    }

    #[test]
    fn version_token_changes_on_every_write() {
        let store = MemoryStateStore::new();
        let p = leases("default");
        let v1 = store
            .upsert(StateEntry::new("h_foo", json!(1)), &p)
            .unwrap();
        let v2 = store
            .upsert(StateEntry::new("h_foo", json!(2)), &p)
            .unwrap();
        assert_ne!(v1, v2);
    }

    #[test]
    fn stale_token_is_not_rejected() {
        // Documented last-write-wins policy.
        let store = MemoryStateStore::new();
        let p = leases("default");
        store
            .upsert(StateEntry::new("h_foo", json!(1)), &p)
            .unwrap();
        store
            .upsert(StateEntry::new("h_foo", json!(2)), &p)
            .unwrap();

        let mut stale = StateEntry::new("h_foo", json!(3));
        stale.version = "1".to_string();
        let v = store.upsert(stale, &p).unwrap();
        assert_eq!(v, "3");
        assert_eq!(store.get("h_foo", &p).unwrap().body, json!(3));
    }

    #[test]
    fn delete_missing_is_not_found_and_present_removes() {
        let store = MemoryStateStore::new();
        let p = leases("default");
        assert!(store.delete("h_x", &p).unwrap_err().is_not_found());

        store.upsert(StateEntry::new("h_x", json!(1)), &p).unwrap();
        store.delete("h_x", &p).unwrap();
        assert!(store.get("h_x", &p).unwrap_err().is_not_found());
    }

    #[test]
    fn list_is_partition_scoped() {
        let store = MemoryStateStore::new();
        store
            .upsert(StateEntry::new("h_a", json!(1)), &leases("ns-1"))
            .unwrap();
        store
            .upsert(StateEntry::new("h_b", json!(2)), &leases("ns-1"))
            .unwrap();
        store
            .upsert(StateEntry::new("h_c", json!(3)), &leases("ns-2"))
            .unwrap();

        let (entries, token) = store.list(&leases("ns-1")).unwrap();
        assert_eq!(token, None);
        assert_eq!(
            entries.iter().map(|e| e.id.as_str()).collect::<Vec<_>>(),
            vec!["h_a", "h_b"]
        );
    }

    #[test]
    fn volatile_and_persistent_keyspaces_are_disjoint() {
        let store = MemoryStateStore::new();
        let v = Partition::volatile("ns", "markers", "LastSuccessTime");
        let p = Partition::persistent("ns", "markers", "LastSuccessTime");
        store.upsert(StateEntry::new("i_x", json!(1)), &v).unwrap();
        assert!(store.get("i_x", &p).unwrap_err().is_not_found());
    }
}
