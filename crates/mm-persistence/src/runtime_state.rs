//! Durable `runtime_state` key-value store contract and the bootstrap
//! persistence decision it exists to support.

use crate::error::PersistenceResult;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The five bootstrap keys the contract persists across restarts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct BootstrapState {
    pub bootstrap_active: bool,
    pub bootstrap_started_at: Option<i64>,
    pub bootstrap_ends_at: Option<i64>,
    pub bootstrap_cycles_remaining: u32,
    pub bootstrap_last_entry_at: Option<i64>,
}

/// What a fresh startup should do with bootstrap, per the persistence
/// contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapDecision {
    Resume,
    Skip,
    Off,
}

/// Evaluate the bootstrap persistence contract on startup.
///
/// - If saved state is active and `now_ms < ends_at`, RESUME.
/// - Else if recent durable snapshots already cover enough history (more
///   than 50 in the last 6h, or at least 3 pools with 15+ snapshots each),
///   SKIP bootstrap entirely.
/// - Else OFF, until a first entry triggers START.
pub fn evaluate_bootstrap(
    saved: &BootstrapState,
    now_ms: i64,
    snapshots_last_6h: u32,
    pools_with_15_plus_snapshots: u32,
) -> BootstrapDecision {
    if saved.bootstrap_active {
        if let Some(ends_at) = saved.bootstrap_ends_at {
            if now_ms < ends_at {
                return BootstrapDecision::Resume;
            }
        }
    }

    if snapshots_last_6h > 50 || pools_with_15_plus_snapshots >= 3 {
        return BootstrapDecision::Skip;
    }

    BootstrapDecision::Off
}

/// Durable key-value contract for bootstrap persistence. The core depends
/// only on this trait boundary; a concrete store (Postgres, SQLite, etc.)
/// lives with the operator, not in this crate.
pub trait RuntimeStateStore: Send + Sync {
    fn load_bootstrap_state(&self) -> PersistenceResult<BootstrapState>;
    fn save_bootstrap_state(&self, state: &BootstrapState) -> PersistenceResult<()>;
}

/// Minimal file-backed `RuntimeStateStore`: one JSON file holding the
/// current `BootstrapState`, rewritten atomically (write-to-temp then
/// rename) on every save.
pub struct FileRuntimeStateStore {
    path: PathBuf,
}

impl FileRuntimeStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RuntimeStateStore for FileRuntimeStateStore {
    fn load_bootstrap_state(&self) -> PersistenceResult<BootstrapState> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no runtime state file, defaulting bootstrap state");
            return Ok(BootstrapState::default());
        }
        let contents = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn save_bootstrap_state(&self, state: &BootstrapState) -> PersistenceResult<()> {
        let tmp_path = tmp_path_for(&self.path);
        let json = serde_json::to_string_pretty(state)?;
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

/// In-memory `RuntimeStateStore` for tests and dry runs where durability
/// across process restarts isn't needed.
pub struct InMemoryRuntimeStateStore {
    state: parking_lot::Mutex<BootstrapState>,
}

impl InMemoryRuntimeStateStore {
    pub fn new() -> Self {
        Self {
            state: parking_lot::Mutex::new(BootstrapState::default()),
        }
    }
}

impl Default for InMemoryRuntimeStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeStateStore for InMemoryRuntimeStateStore {
    fn load_bootstrap_state(&self) -> PersistenceResult<BootstrapState> {
        Ok(*self.state.lock())
    }

    fn save_bootstrap_state(&self, state: &BootstrapState) -> PersistenceResult<()> {
        *self.state.lock() = *state;
        Ok(())
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let file_name = tmp
        .file_name()
        .map(|n| format!("{}.tmp", n.to_string_lossy()))
        .unwrap_or_else(|| "runtime_state.tmp".to_string());
    tmp.set_file_name(file_name);
    tmp
}
