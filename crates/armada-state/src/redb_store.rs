//! Durable state store backed by redb.
//!
//! Entries are JSON-serialized into redb's `&[u8]` value columns, one table
//! per durability class. The volatile table is dropped on open — losing a
//! success marker only costs an extra reconcile, and a fresh process should
//! re-verify the fleet anyway. The persistent table survives restarts.
//!
//! Version-token policy: this backend ENFORCES compare-and-swap. An upsert
//! whose entry carries a non-empty version token that no longer matches the
//! stored one fails with `Conflict`. An empty token always writes.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::store::StateStore;
use crate::tables::{PERSISTENT, VOLATILE};
use crate::types::{Durability, Partition, StateEntry};

/// Convert any `Display` error into a `StateError::Storage`.
macro_rules! storage_err {
    () => {
        |e| StateError::Storage(e.to_string())
    };
}

/// Thread-safe durable store with CAS-enforcing upserts.
#[derive(Clone)]
pub struct RedbStateStore {
    db: Arc<Database>,
}

impl RedbStateStore {
    /// Open (or create) a store at the given path, clearing the volatile
    /// partition.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(storage_err!())?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables(true)?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(storage_err!())?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables(false)?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    /// Create both tables if absent; optionally drop-and-recreate the
    /// volatile one.
    fn ensure_tables(&self, clear_volatile: bool) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(storage_err!())?;
        if clear_volatile {
            txn.delete_table(VOLATILE).map_err(storage_err!())?;
        }
        {
            // Opening a table in a write transaction creates it if absent.
            txn.open_table(VOLATILE).map_err(storage_err!())?;
            txn.open_table(PERSISTENT).map_err(storage_err!())?;
        }
        txn.commit().map_err(storage_err!())?;
        Ok(())
    }

    fn table(durability: Durability) -> TableDefinition<'static, &'static str, &'static [u8]> {
        match durability {
            Durability::Volatile => VOLATILE,
            Durability::Persistent => PERSISTENT,
        }
    }

    fn decode(bytes: &[u8]) -> StateResult<StateEntry> {
        serde_json::from_slice(bytes).map_err(|e| StateError::Serialize(e.to_string()))
    }
}

impl StateStore for RedbStateStore {
    fn get(&self, id: &str, partition: &Partition) -> StateResult<StateEntry> {
        let txn = self.db.begin_read().map_err(storage_err!())?;
        let table = txn
            .open_table(Self::table(partition.durability))
            .map_err(storage_err!())?;
        let key = partition.key_for(id);
        match table.get(key.as_str()).map_err(storage_err!())? {
            Some(guard) => Self::decode(guard.value()),
            None => Err(StateError::NotFound(id.to_string())),
        }
    }

    fn upsert(&self, mut entry: StateEntry, partition: &Partition) -> StateResult<String> {
        let key = partition.key_for(&entry.id);
        let txn = self.db.begin_write().map_err(storage_err!())?;
        let version;
        {
            let mut table = txn
                .open_table(Self::table(partition.durability))
                .map_err(storage_err!())?;

            let stored_version = match table.get(key.as_str()).map_err(storage_err!())? {
                Some(guard) => Some(Self::decode(guard.value())?.version),
                None => None,
            };

            if let Some(stored) = &stored_version {
                if !entry.version.is_empty() && entry.version != *stored {
                    return Err(StateError::Conflict {
                        id: entry.id,
                        supplied: entry.version,
                        stored: stored.clone(),
                    });
                }
            }

            let next = stored_version
                .as_deref()
                .map(|v| v.parse::<u64>().unwrap_or(0) + 1)
                .unwrap_or(1);
            entry.version = next.to_string();
            version = entry.version.clone();

            let value =
                serde_json::to_vec(&entry).map_err(|e| StateError::Serialize(e.to_string()))?;
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(storage_err!())?;
        }
        txn.commit().map_err(storage_err!())?;
        debug!(id = %key, %version, "state upsert");
        Ok(version)
    }

    fn delete(&self, id: &str, partition: &Partition) -> StateResult<()> {
        let key = partition.key_for(id);
        let txn = self.db.begin_write().map_err(storage_err!())?;
        let existed;
        {
            let mut table = txn
                .open_table(Self::table(partition.durability))
                .map_err(storage_err!())?;
            existed = table.remove(key.as_str()).map_err(storage_err!())?.is_some();
        }
        txn.commit().map_err(storage_err!())?;
        if existed {
            Ok(())
        } else {
            Err(StateError::NotFound(id.to_string()))
        }
    }

    fn list(&self, partition: &Partition) -> StateResult<(Vec<StateEntry>, Option<String>)> {
        let txn = self.db.begin_read().map_err(storage_err!())?;
        let table = txn
            .open_table(Self::table(partition.durability))
            .map_err(storage_err!())?;
        let prefix = partition.key_prefix();
        let mut entries = Vec::new();
        for item in table.iter().map_err(storage_err!())? {
            let (key, value) = item.map_err(storage_err!())?;
            if key.value().starts_with(&prefix) {
                entries.push(Self::decode(value.value())?);
            }
        }
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok((entries, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn markers(ns: &str) -> Partition {
        Partition::volatile(ns, "markers", "LastSuccessTime")
    }

    fn activations(ns: &str) -> Partition {
        Partition::persistent(ns, "activations", "Activation")
    }

    #[test]
    fn upsert_get_delete_roundtrip() {
        let store = RedbStateStore::open_in_memory().unwrap();
        let p = markers("default");

        let v = store
            .upsert(StateEntry::new("i_app", json!({"time": "2024-03-01T00:00:00Z"})), &p)
            .unwrap();
        assert_eq!(v, "1");

        let entry = store.get("i_app", &p).unwrap();
        assert_eq!(entry.id, "i_app");
        assert_eq!(entry.version, "1");

        store.delete("i_app", &p).unwrap();
        assert!(store.get("i_app", &p).unwrap_err().is_not_found());
        assert!(store.delete("i_app", &p).unwrap_err().is_not_found());
    }

    #[test]
    fn token_advances_on_every_write() {
        let store = RedbStateStore::open_in_memory().unwrap();
        let p = markers("default");
        let v1 = store.upsert(StateEntry::new("i_a", json!(1)), &p).unwrap();
        let v2 = store.upsert(StateEntry::new("i_a", json!(2)), &p).unwrap();
        assert_ne!(v1, v2);
    }

    #[test]
    fn stale_token_is_rejected() {
        // Documented CAS policy.
        let store = RedbStateStore::open_in_memory().unwrap();
        let p = activations("default");

        store.upsert(StateEntry::new("sch_c-a", json!(1)), &p).unwrap();
        store.upsert(StateEntry::new("sch_c-a", json!(2)), &p).unwrap();

        let mut stale = StateEntry::new("sch_c-a", json!(3));
        stale.version = "1".to_string();
        let err = store.upsert(stale, &p).unwrap_err();
        assert!(matches!(err, StateError::Conflict { .. }));
        // The losing write left no trace.
        assert_eq!(store.get("sch_c-a", &p).unwrap().body, json!(2));
    }

    #[test]
    fn matching_token_writes() {
        let store = RedbStateStore::open_in_memory().unwrap();
        let p = activations("default");

        let v1 = store.upsert(StateEntry::new("sch_c-a", json!(1)), &p).unwrap();
        let mut entry = StateEntry::new("sch_c-a", json!(2));
        entry.version = v1;
        let v2 = store.upsert(entry, &p).unwrap();
        assert_eq!(v2, "2");
    }

    #[test]
    fn list_filters_by_partition() {
        let store = RedbStateStore::open_in_memory().unwrap();
        store
            .upsert(StateEntry::new("sch_a", json!(1)), &activations("ns-1"))
            .unwrap();
        store
            .upsert(StateEntry::new("sch_b", json!(2)), &activations("ns-2"))
            .unwrap();

        let (entries, _) = store.list(&activations("ns-1")).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "sch_a");
    }

    #[test]
    fn volatile_partition_cleared_on_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("armada.redb");

        {
            let store = RedbStateStore::open(&path).unwrap();
            store
                .upsert(StateEntry::new("i_app", json!(1)), &markers("default"))
                .unwrap();
            store
                .upsert(StateEntry::new("sch_c-a", json!(2)), &activations("default"))
                .unwrap();
        }

        let store = RedbStateStore::open(&path).unwrap();
        assert!(store
            .get("i_app", &markers("default"))
            .unwrap_err()
            .is_not_found());
        // Parked activations survive.
        assert_eq!(
            store.get("sch_c-a", &activations("default")).unwrap().body,
            json!(2)
        );
    }
}
