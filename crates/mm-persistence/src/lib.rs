//! Persistence contracts for the market-making controller: a durable
//! `runtime_state` key-value store for bootstrap persistence, a `positions`
//! table that is the sole source of truth for open positions, and bounded
//! pool-snapshot history for rebuilding rolling stats after a restart.
//!
//! Each contract is a trait the core depends on; the file-backed
//! implementations here exist to make the test suite and a local dry-run
//! binary work, not as a production persistence engine.

pub mod error;
pub mod positions_store;
pub mod runtime_state;
pub mod snapshot_store;
pub mod traits;

pub use error::{PersistenceError, PersistenceResult};
pub use positions_store::{
    require_open, FilePositionsStore, InMemoryPositionsStore, PersistedPosition, PositionsStore,
};
pub use runtime_state::{
    evaluate_bootstrap, BootstrapDecision, BootstrapState, FileRuntimeStateStore,
    InMemoryRuntimeStateStore, RuntimeStateStore,
};
pub use snapshot_store::{SnapshotRecord, SnapshotStore};
pub use traits::{ClockSource, PoolSnapshotSource, StaticPoolSnapshotSource};
