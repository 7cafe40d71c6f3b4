//! In-memory store for tests and ephemeral runs

use std::sync::{Mutex, PoisonError};

use crate::{Snapshot, Store, StoreResult};

#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshot: Mutex<Snapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
        }
    }
}

impl Store for MemoryStore {
    fn load(&self) -> StoreResult<Snapshot> {
        Ok(self.snapshot.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn save(&self, snapshot: &Snapshot) -> StoreResult<()> {
        *self.snapshot.lock().unwrap_or_else(PoisonError::into_inner) = snapshot.clone();
        Ok(())
    }

    fn modify(&self, f: &mut dyn FnMut(&mut Snapshot)) -> StoreResult<()> {
        let mut guard = self.snapshot.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut *guard);
        Ok(())
    }

    fn clear(&self) -> StoreResult<()> {
        *self.snapshot.lock().unwrap_or_else(PoisonError::into_inner) = Snapshot::default();
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        true
    }
}
