//! The trait boundary between the decision core and its out-of-scope
//! collaborators: pool discovery/enrichment, on-chain RPC, the full
//! persistence engine, and the system clock. No concrete HTTP/WS/on-chain
//! client ships here; only the boundary and a minimal in-memory/file-backed
//! implementation of each trait so the test suite and a local dry-run
//! binary have something to run against.

use mm_registry::PoolSnapshot;

/// Re-exported under the name the external-interface boundary uses;
/// `mm_core::Clock` already is this contract, so there is no separate
/// `ClockSource` type to define.
pub use mm_core::Clock as ClockSource;

/// Supplies the current set of candidate pool snapshots each cycle. The
/// concrete implementation (HTTP polling, a subgraph indexer, whatever)
/// lives with the discovery collaborator, not in this crate.
pub trait PoolSnapshotSource: Send + Sync {
    fn snapshots(&self) -> Vec<PoolSnapshot>;
}

/// A `PoolSnapshotSource` over a fixed, caller-supplied list. Useful for
/// tests and the local dry-run binary.
pub struct StaticPoolSnapshotSource {
    snapshots: Vec<PoolSnapshot>,
}

impl StaticPoolSnapshotSource {
    pub fn new(snapshots: Vec<PoolSnapshot>) -> Self {
        Self { snapshots }
    }
}

impl PoolSnapshotSource for StaticPoolSnapshotSource {
    fn snapshots(&self) -> Vec<PoolSnapshot> {
        self.snapshots.clone()
    }
}
