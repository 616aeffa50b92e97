//! The `positions` table contract: the single source of truth for open
//! positions. The core must never infer open positions from any other
//! table (pool snapshots, rebalance history, etc).

use crate::error::{PersistenceError, PersistenceResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use tracing::debug;

/// A position record as persisted, independent of the in-process lifecycle
/// type so this crate has no dependency on `mm-position`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistedPosition {
    pub position_id: String,
    pub pool_id: String,
    pub size: String,
    pub stage: String,
    pub entry_ts_ms: i64,
}

pub trait PositionsStore: Send + Sync {
    fn upsert(&self, position: PersistedPosition) -> PersistenceResult<()>;
    fn remove(&self, position_id: &str) -> PersistenceResult<()>;
    fn list_open(&self) -> PersistenceResult<Vec<PersistedPosition>>;
}

/// In-memory positions store, keyed by position id.
pub struct InMemoryPositionsStore {
    positions: parking_lot::Mutex<HashMap<String, PersistedPosition>>,
}

impl InMemoryPositionsStore {
    pub fn new() -> Self {
        Self {
            positions: parking_lot::Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryPositionsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionsStore for InMemoryPositionsStore {
    fn upsert(&self, position: PersistedPosition) -> PersistenceResult<()> {
        self.positions
            .lock()
            .insert(position.position_id.clone(), position);
        Ok(())
    }

    fn remove(&self, position_id: &str) -> PersistenceResult<()> {
        self.positions.lock().remove(position_id);
        Ok(())
    }

    fn list_open(&self) -> PersistenceResult<Vec<PersistedPosition>> {
        Ok(self.positions.lock().values().cloned().collect())
    }
}

/// File-backed positions store: the whole table lives as one JSON-lines
/// file, rewritten in full on every mutation (append-only would let closed
/// positions resurface on replay, which the "sole source of truth"
/// invariant forbids).
pub struct FilePositionsStore {
    path: PathBuf,
}

impl FilePositionsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_all(&self) -> PersistenceResult<HashMap<String, PersistedPosition>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let mut positions = HashMap::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let position: PersistedPosition = serde_json::from_str(&line)?;
            positions.insert(position.position_id.clone(), position);
        }
        Ok(positions)
    }

    fn write_all(&self, positions: &HashMap<String, PersistedPosition>) -> PersistenceResult<()> {
        let tmp_path = self.path.with_extension("jsonl.tmp");
        {
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp_path)?;
            for position in positions.values() {
                let json = serde_json::to_string(position)?;
                writeln!(file, "{}", json)?;
            }
            file.flush()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl PositionsStore for FilePositionsStore {
    fn upsert(&self, position: PersistedPosition) -> PersistenceResult<()> {
        let mut positions = self.read_all()?;
        positions.insert(position.position_id.clone(), position);
        self.write_all(&positions)?;
        Ok(())
    }

    fn remove(&self, position_id: &str) -> PersistenceResult<()> {
        let mut positions = self.read_all()?;
        if positions.remove(position_id).is_none() {
            debug!(position_id, "remove called for unknown position, ignoring");
        }
        self.write_all(&positions)?;
        Ok(())
    }

    fn list_open(&self) -> PersistenceResult<Vec<PersistedPosition>> {
        Ok(self.read_all()?.into_values().collect())
    }
}

/// Lookup helper used at reconciliation time: error if a position the
/// caller expects open isn't in the table.
pub fn require_open(
    store: &dyn PositionsStore,
    position_id: &str,
) -> PersistenceResult<PersistedPosition> {
    store
        .list_open()?
        .into_iter()
        .find(|p| p.position_id == position_id)
        .ok_or_else(|| PersistenceError::PositionNotFound(position_id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample(id: &str) -> PersistedPosition {
        PersistedPosition {
            position_id: id.to_string(),
            pool_id: "pool-1".to_string(),
            size: "100.00".to_string(),
            stage: "PROBE".to_string(),
            entry_ts_ms: 0,
        }
    }

    #[test]
    fn in_memory_round_trips() {
        let store = InMemoryPositionsStore::new();
        store.upsert(sample("pos-1")).unwrap();
        assert_eq!(store.list_open().unwrap().len(), 1);
        store.remove("pos-1").unwrap();
        assert!(store.list_open().unwrap().is_empty());
    }

    #[test]
    fn file_store_is_sole_source_across_restarts() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("positions.jsonl");

        {
            let store = FilePositionsStore::new(&path);
            store.upsert(sample("pos-1")).unwrap();
            store.upsert(sample("pos-2")).unwrap();
        }

        let store = FilePositionsStore::new(&path);
        let open = store.list_open().unwrap();
        assert_eq!(open.len(), 2);

        store.remove("pos-1").unwrap();
        let store = FilePositionsStore::new(&path);
        let open = store.list_open().unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].position_id, "pos-2");
    }

    #[test]
    fn require_open_errors_on_unknown_position() {
        let store = InMemoryPositionsStore::new();
        let err = require_open(&store, "missing").unwrap_err();
        assert!(matches!(err, PersistenceError::PositionNotFound(_)));
    }
}
