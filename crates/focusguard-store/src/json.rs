//! JSON file store implementation

use nix::fcntl::{Flock, FlockArg};
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

use crate::{Snapshot, Store, StoreError, StoreResult};

/// Snapshot kept as a single JSON file, rewritten whole on every change.
///
/// Every access holds an in-process mutex and an exclusive `flock` on a
/// sibling `.json.lock` file, so other processes opening the same path (the
/// one-shot subcommands next to a running service) are serialized too.
pub struct JsonFileStore {
    path: PathBuf,
    lock_path: PathBuf,
    lock: Mutex<()>,
}

/// Held for the duration of one store operation
struct StoreGuard<'a> {
    _file: Flock<File>,
    _local: MutexGuard<'a, ()>,
}

impl JsonFileStore {
    /// Open a store at the given path. The file is created on first write.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        debug!(path = %path.display(), "Opened JSON store");
        Ok(Self {
            lock_path: path.with_extension("json.lock"),
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn guard(&self) -> StoreResult<StoreGuard<'_>> {
        let local = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&self.lock_path)?;
        let file = Flock::lock(file, FlockArg::LockExclusive).map_err(|(_, errno)| {
            warn!(path = %self.lock_path.display(), error = %errno, "Failed to lock store");
            io::Error::from(errno)
        })?;
        Ok(StoreGuard {
            _file: file,
            _local: local,
        })
    }

    fn read_locked(&self) -> StoreResult<Snapshot> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Snapshot::default()),
            Err(e) => return Err(e.into()),
        };

        Snapshot::from_json(&content).map_err(|e| {
            warn!(path = %self.path.display(), error = %e, "Snapshot is corrupted");
            StoreError::Corrupted {
                path: self.path.clone(),
                message: e.to_string(),
            }
        })
    }

    fn write_locked(&self, snapshot: &Snapshot) -> StoreResult<()> {
        let json = snapshot.to_json()?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        debug!(
            rules = snapshot.block_rules.len(),
            bypasses = snapshot.bypasses.len(),
            timers = snapshot.active_timers.len(),
            "Snapshot written"
        );
        Ok(())
    }
}

impl Store for JsonFileStore {
    fn load(&self) -> StoreResult<Snapshot> {
        let _guard = self.guard()?;
        self.read_locked()
    }

    fn save(&self, snapshot: &Snapshot) -> StoreResult<()> {
        let _guard = self.guard()?;
        self.write_locked(snapshot)
    }

    fn modify(&self, f: &mut dyn FnMut(&mut Snapshot)) -> StoreResult<()> {
        let _guard = self.guard()?;
        let before = self.read_locked()?;
        let mut after = before.clone();
        f(&mut after);
        if after != before {
            self.write_locked(&after)?;
        }
        Ok(())
    }

    fn clear(&self) -> StoreResult<()> {
        let _guard = self.guard()?;
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn is_healthy(&self) -> bool {
        let Ok(_guard) = self.guard() else {
            return false;
        };
        self.read_locked().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use focusguard_model::BypassRule;
    use focusguard_util::{BypassId, ResourceId};

    fn bypass(id: &str) -> BypassRule {
        BypassRule::new(BypassId::new(id), ResourceId::new("app.a"), 0, 1_000).unwrap()
    }

    #[test]
    fn missing_file_is_empty_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("block_store.json")).unwrap();
        assert!(store.load().unwrap().is_empty());
        assert!(store.is_healthy());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("nested/block_store.json")).unwrap();

        let snapshot = Snapshot {
            bypasses: vec![bypass("b1")],
            ..Default::default()
        };
        store.save(&snapshot).unwrap();

        let reopened = JsonFileStore::open(store.path()).unwrap();
        assert_eq!(reopened.load().unwrap(), snapshot);
    }

    #[test]
    fn corrupted_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("block_store.json");
        fs::write(&path, "{ not json").unwrap();

        let store = JsonFileStore::open(&path).unwrap();
        assert!(matches!(store.load(), Err(StoreError::Corrupted { .. })));
        assert!(!store.is_healthy());

        // A failed read must not be turned into an empty write
        assert!(store.modify(&mut |s| s.bypasses.clear()).is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn modify_only_writes_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("block_store.json");
        let store = JsonFileStore::open(&path).unwrap();

        store.modify(&mut |_| {}).unwrap();
        assert!(!path.exists());

        store.modify(&mut |s| s.bypasses.push(bypass("b1"))).unwrap();
        assert_eq!(store.load().unwrap().bypasses.len(), 1);
    }

    #[test]
    fn separate_handles_do_not_lose_updates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("block_store.json");

        let writers: Vec<_> = (0..4)
            .map(|w| {
                let store = JsonFileStore::open(&path).unwrap();
                std::thread::spawn(move || {
                    for i in 0..10 {
                        let id = format!("w{w}-{i}");
                        store.modify(&mut |s| s.bypasses.push(bypass(&id))).unwrap();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.load().unwrap().bypasses.len(), 40);
    }

    #[test]
    fn clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("block_store.json");
        let store = JsonFileStore::open(&path).unwrap();
        store.save(&Snapshot::default()).unwrap();
        assert!(path.exists());

        store.clear().unwrap();
        assert!(!path.exists());
        store.clear().unwrap();
    }
}
