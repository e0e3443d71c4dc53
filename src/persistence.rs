//! Snapshot persistence for learner state.
//!
//! The whole `LearnerState` is written as one JSON document after every
//! mutation, so records and queue can never be persisted out of step
//! with each other. The file store writes to a temp file and renames it
//! into place; a crash mid-write leaves the previous snapshot intact.

use crate::store::LearnerState;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub trait SnapshotStore: Send + Sync {
    fn load(&self, learner_id: &str) -> Result<Option<LearnerState>, SnapshotError>;
    fn save(&self, learner_id: &str, state: &LearnerState) -> Result<(), SnapshotError>;
}

/// One JSON file per learner under a base directory.
#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, SnapshotError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn snapshot_path(&self, learner_id: &str) -> PathBuf {
        // Learner ids are opaque; keep only filename-safe characters.
        let safe: String = learner_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self, learner_id: &str) -> Result<Option<LearnerState>, SnapshotError> {
        let path = self.snapshot_path(learner_id);
        let data = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&data)?))
    }

    fn save(&self, learner_id: &str, state: &LearnerState) -> Result<(), SnapshotError> {
        let path = self.snapshot_path(learner_id);
        let tmp = path.with_extension("json.tmp");
        let data = serde_json::to_vec_pretty(state)?;
        write_atomic(&tmp, &path, &data)?;
        Ok(())
    }
}

fn write_atomic(tmp: &Path, dest: &Path, data: &[u8]) -> std::io::Result<()> {
    fs::write(tmp, data)?;
    fs::rename(tmp, dest)
}

/// Keeps snapshots in memory. Used in tests and by embedders that do
/// their own durability.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    inner: RwLock<HashMap<String, LearnerState>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self, learner_id: &str) -> Result<Option<LearnerState>, SnapshotError> {
        Ok(self.inner.read().get(learner_id).cloned())
    }

    fn save(&self, learner_id: &str, state: &LearnerState) -> Result<(), SnapshotError> {
        self.inner
            .write()
            .insert(learner_id.to_string(), state.clone());
        Ok(())
    }
}
