//! The state store contract.

use crate::error::StateResult;
use crate::types::{Partition, StateEntry};

/// Typed Get/Upsert/Delete/List over opaque records keyed by id plus
/// partition metadata.
///
/// Contract, kept deliberately weak so multiple backends qualify:
/// - `upsert` assigns a fresh version token on every successful write; the
///   token's only guarantee is that it changes per write.
/// - A backend MAY reject an upsert whose entry carries a non-empty version
///   token that no longer matches the stored one (compare-and-swap), or MAY
///   ignore the supplied token entirely. Callers must assume neither; each
///   implementation documents its policy.
/// - `get` and `delete` report an absent record as `NotFound`.
/// - `list` returns every entry in the partition plus an optional
///   continuation token (reference backends return the full set and `None`).
pub trait StateStore: Send + Sync {
    fn get(&self, id: &str, partition: &Partition) -> StateResult<StateEntry>;

    /// Write the entry and return its new version token.
    fn upsert(&self, entry: StateEntry, partition: &Partition) -> StateResult<String>;

    fn delete(&self, id: &str, partition: &Partition) -> StateResult<()>;

    fn list(&self, partition: &Partition) -> StateResult<(Vec<StateEntry>, Option<String>)>;
}
