//! Persisted timer snapshot

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};
use tracing::debug;

use super::TimerState;
use crate::{
    error::{GuardError, Result},
    utils::atomic_write,
};

/// File name of the single snapshot record inside the state directory
pub const SNAPSHOT_FILE: &str = "timer_state.json";

/// Single-key storage for the canonical timer record.
///
/// Only the authority writes; control surfaces only ever call `load`.
pub trait SnapshotStore: Send {
    fn load(&self) -> Result<Option<TimerState>>;
    fn save(&self, state: &TimerState) -> Result<()>;
}

/// Snapshot stored as one JSON document on disk
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store placed at the conventional file name inside `state_dir`
    pub fn in_dir(state_dir: &Path) -> Self {
        Self::new(state_dir.join(SNAPSHOT_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self) -> Result<Option<TimerState>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No snapshot at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn save(&self, state: &TimerState) -> Result<()> {
        let json = serde_json::to_vec_pretty(state)?;
        atomic_write(&self.path, &json)?;
        Ok(())
    }
}

/// In-process snapshot for ephemeral runs.
///
/// Clones share the same record, so a clone can act as a reader the way a
/// control surface reads the file store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    record: Arc<Mutex<Option<TimerState>>>,
    failing: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(state: TimerState) -> Self {
        let store = Self::default();
        if let Ok(mut record) = store.record.lock() {
            *record = Some(state);
        }
        store
    }

    /// Make every subsequent read and write fail
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(GuardError::Unavailable("snapshot store"));
        }
        Ok(())
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> Result<Option<TimerState>> {
        self.check()?;
        self.record
            .lock()
            .map(|record| record.clone())
            .map_err(|_| GuardError::LockPoisoned("snapshot record"))
    }

    fn save(&self, state: &TimerState) -> Result<()> {
        self.check()?;
        let mut record = self.record
            .lock()
            .map_err(|_| GuardError::LockPoisoned("snapshot record"))?;
        *record = Some(state.clone());
        Ok(())
    }
}
