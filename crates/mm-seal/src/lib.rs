//! Reconciliation seal and capital ledger.
//!
//! Startup recovery computes a [`seal::SealInput`] from the persistence
//! layer, hydrates `Position` objects, and calls [`ReconciliationSeal::seal`]
//! exactly once. From that point on every other crate treats the sealed
//! totals as ground truth and mutates the [`Ledger`] only through its
//! reserve/release API.

pub mod error;
pub mod ledger;
pub mod seal;

pub use error::{Result, SealError};
pub use ledger::{Ledger, ReserveRejection, PER_POOL_ENTRY_CAP, PER_POOL_STEADY_STATE_CAP, RESERVE_RATIO};
pub use seal::{EngineMode, HydrationResult, ReconciliationSeal, SealInput, SealRecord};
