//! Pool snapshot persistence: just enough history (6h) to rebuild rolling
//! stats after a restart, not a general analytics log. JSON Lines format so
//! a partial write on crash only loses the last line.

use crate::error::PersistenceResult;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use tracing::debug;

const RETENTION_MS: i64 = 6 * 60 * 60 * 1000;

/// Enough of a `PoolSnapshot` to rebuild the four rolling stats the
/// Opportunity Density Detector needs (fee_intensity, volume_in_range,
/// bin_stability inputs, churn_quality inputs).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub pool_id_hash: u64,
    pub ts_ms: i64,
    pub fee_intensity: f64,
    pub volume_in_range: f64,
    pub migration_slope: f64,
    pub bin_velocity: f64,
    pub swap_velocity: f64,
    pub price_velocity: f64,
}

/// Append-only JSON Lines snapshot log with periodic pruning to the 6h
/// retention window.
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn append(&self, record: &SnapshotRecord) -> PersistenceResult<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let json = serde_json::to_string(record)?;
        writeln!(file, "{}", json)?;
        Ok(())
    }

    /// Read back every snapshot within the 6h retention window as of
    /// `now_ms`, regardless of whether `prune` has run recently.
    pub fn load_recent(&self, now_ms: i64) -> PersistenceResult<Vec<SnapshotRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: SnapshotRecord = serde_json::from_str(&line)?;
            if now_ms - record.ts_ms <= RETENTION_MS {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Rewrite the log keeping only entries within the retention window.
    /// Callers run this periodically (not on every append) to bound file
    /// growth.
    pub fn prune(&self, now_ms: i64) -> PersistenceResult<()> {
        let recent = self.load_recent(now_ms)?;
        let tmp_path = self.path.with_extension("jsonl.tmp");
        {
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp_path)?;
            for record in &recent {
                let json = serde_json::to_string(record)?;
                writeln!(file, "{}", json)?;
            }
            file.flush()?;
        }
        std::fs::rename(&tmp_path, &self.path)?;
        debug!(retained = recent.len(), "pruned snapshot store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(ts_ms: i64) -> SnapshotRecord {
        SnapshotRecord {
            pool_id_hash: 1,
            ts_ms,
            fee_intensity: 1.0,
            volume_in_range: 1.0,
            migration_slope: 0.0,
            bin_velocity: 0.0,
            swap_velocity: 1.0,
            price_velocity: 1.0,
        }
    }

    #[test]
    fn load_recent_excludes_entries_past_retention() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path().join("snapshots.jsonl"));

        store.append(&record(0)).unwrap();
        store.append(&record(RETENTION_MS / 2)).unwrap();
        store.append(&record(RETENTION_MS + 1_000)).unwrap();

        let recent = store.load_recent(RETENTION_MS + 1_000).unwrap();
        assert_eq!(recent.len(), 2);
    }

    #[test]
    fn prune_rewrites_file_to_only_recent_entries() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path().join("snapshots.jsonl"));

        store.append(&record(0)).unwrap();
        store.append(&record(RETENTION_MS + 1_000)).unwrap();

        store.prune(RETENTION_MS + 1_000).unwrap();
        let recent = store.load_recent(RETENTION_MS + 1_000).unwrap();
        assert_eq!(recent.len(), 1);
    }
}
