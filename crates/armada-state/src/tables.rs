//! redb table definitions for the durable state store.
//!
//! Both tables use `&str` keys and `&[u8]` values (JSON-serialized
//! `StateEntry`). Keys are partition-qualified:
//! `{namespace}/{group}/{resource}/{kind}/{id}`.

use redb::TableDefinition;

/// Volatile partition — success markers and other records a restart may
/// cheaply lose. Cleared on open.
pub const VOLATILE: TableDefinition<&str, &[u8]> = TableDefinition::new("volatile");

/// Persistent partition — parked activations and other records that must
/// survive a restart.
pub const PERSISTENT: TableDefinition<&str, &[u8]> = TableDefinition::new("persistent");
