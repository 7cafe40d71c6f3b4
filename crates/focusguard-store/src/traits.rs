//! Store trait definitions

use crate::{Snapshot, StoreResult};

/// Durable home of the [`Snapshot`].
///
/// Implementations serialize every call behind one lock, so a
/// [`Store::modify`] closure sees and replaces the document atomically with
/// respect to other callers.
pub trait Store: Send + Sync {
    /// Read the current snapshot. A missing document is an empty snapshot; a
    /// document that exists but cannot be parsed is [`crate::StoreError::Corrupted`].
    fn load(&self) -> StoreResult<Snapshot>;

    /// Replace the whole snapshot
    fn save(&self, snapshot: &Snapshot) -> StoreResult<()>;

    /// Read-modify-write under the store lock. The snapshot is written back
    /// only if the closure changed it.
    fn modify(&self, f: &mut dyn FnMut(&mut Snapshot)) -> StoreResult<()>;

    /// Remove the persisted document
    fn clear(&self) -> StoreResult<()>;

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}
