//! armada-state — the shared, versioned state substrate.
//!
//! Every orchestrator process reads and writes the same store: heartbeat
//! leases, last-success markers, and parked activations all live here. The
//! contract is deliberately small — typed Get/Upsert/Delete/List over opaque
//! JSON bodies keyed by id plus partition metadata, with an opaque version
//! token that changes on every successful write.
//!
//! Two reference backends are provided:
//! - [`MemoryStateStore`] — last-write-wins, for tests and single-process
//!   runs.
//! - [`RedbStateStore`] — durable, with compare-and-swap enforcement when a
//!   caller supplies the version token it last read.
//!
//! Callers must assume neither CAS behavior: the only token contract is
//! "changes on every successful write".

pub mod error;
pub mod memory;
pub mod redb_store;
pub mod store;
mod tables;
pub mod types;

pub use error::{StateError, StateResult};
pub use memory::MemoryStateStore;
pub use redb_store::RedbStateStore;
pub use store::StateStore;
pub use types::{Durability, Partition, StateEntry};
