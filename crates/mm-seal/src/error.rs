//! Error types for mm-seal.

use thiserror::Error;

/// Errors from the reconciliation seal and ledger.
///
/// Every variant here is an `InvariantViolation` in the error taxonomy:
/// the caller MUST treat an `Err` from [`crate::ReconciliationSeal`] as
/// fatal and terminate the process after logging. Production code never
/// attempts to recover from these; they indicate a logic bug, not a
/// transient environment failure.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SealError {
    #[error("seal() called twice: the reconciliation seal may only be set once per process")]
    AlreadySealed,

    #[error(
        "hydration produced {actual_count} positions totaling {actual_locked}, \
         expected {expected_count} totaling {expected_locked} (tolerance $0.01)"
    )]
    HydrationMismatch {
        expected_count: usize,
        expected_locked: String,
        actual_count: usize,
        actual_locked: String,
    },

    #[error("capital rebuild attempted with {open_count} open positions after seal")]
    CapitalRebuildWithOpenPositions { open_count: usize },

    #[error("engine mode cannot transition STATEFUL -> STATELESS after seal")]
    EngineModeFrozen,

    #[error("reconciliation seal not yet established")]
    NotSealed,

    #[error("ledger invariant violated: {0}")]
    LedgerInvariant(String),
}

pub type Result<T> = std::result::Result<T, SealError>;
