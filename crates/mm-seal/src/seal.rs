//! The reconciliation seal: the single build-once, read-everywhere handoff
//! between persisted state and runtime state.
//!
//! Modeled the same way the teacher's emergency-stop latch is: an
//! `AtomicBool` guarded by `compare_exchange` so only the first caller wins,
//! plus the frozen payload behind a lock for everyone else to read. Unlike
//! an emergency stop, the seal is never reset — there is no operator
//! override, because a seal mismatch means the persisted and runtime views
//! of open positions have already diverged and continuing to trade on top
//! of that divergence is the actual danger.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use mm_core::{Money, RunId};

use crate::error::{Result, SealError};

/// Locked to `Stateful` for the lifetime of this specification; the field
/// exists so that an attempted transition to `Stateless` is representable
/// (and rejected) rather than simply absent from the type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineMode {
    Stateful,
    Stateless,
}

/// What startup recovery computes before calling [`ReconciliationSeal::seal`].
#[derive(Debug, Clone)]
pub struct SealInput {
    pub open_count: usize,
    pub locked: Money,
    pub available: Money,
    pub equity: Money,
    pub recovered_count: usize,
    pub run_id: RunId,
    pub sealed_at_ms: i64,
    pub open_position_ids: Vec<mm_core::PositionId>,
}

/// What hydration (rebuilding in-memory `Position` objects from the
/// `positions` table) actually produced — checked against [`SealInput`].
#[derive(Debug, Clone, Copy)]
pub struct HydrationResult {
    pub position_count: usize,
    pub total_locked: Money,
}

/// The frozen, immutable record produced by a successful seal.
#[derive(Debug, Clone)]
pub struct SealRecord {
    pub open_count: usize,
    pub locked: Money,
    pub available: Money,
    pub equity: Money,
    pub recovered_count: usize,
    pub run_id: RunId,
    pub sealed_at_ms: i64,
    pub engine_mode: EngineMode,
    pub open_position_ids: Vec<mm_core::PositionId>,
}

/// Maximum allowed discrepancy between expected and hydrated locked capital.
const HYDRATION_TOLERANCE: Decimal = dec!(0.01);

/// Process-global (per construction) reconciliation seal.
///
/// Construct exactly one instance at startup, call [`Self::seal`] exactly
/// once, then hand out clones of an `Arc<ReconciliationSeal>` to every
/// component that needs to read the frozen totals.
#[derive(Debug, Default)]
pub struct ReconciliationSeal {
    sealed: AtomicBool,
    record: RwLock<Option<SealRecord>>,
}

impl ReconciliationSeal {
    #[must_use]
    pub fn new() -> Self {
        Self {
            sealed: AtomicBool::new(false),
            record: RwLock::new(None),
        }
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::SeqCst)
    }

    /// Seal the recovered startup state exactly once.
    ///
    /// Validates that hydration produced exactly `input.open_count`
    /// positions totaling `input.locked` within [`HYDRATION_TOLERANCE`].
    /// On success the record is frozen and readable via [`Self::record`].
    /// On failure — including a second call — returns an error the caller
    /// MUST treat as fatal (log and `std::process::exit` with a non-zero
    /// code); this type does not perform the exit itself so that it stays
    /// testable.
    pub fn seal(&self, input: SealInput, hydration: HydrationResult) -> Result<()> {
        if self
            .sealed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SealError::AlreadySealed);
        }

        let locked_diff = (hydration.total_locked.inner() - input.locked.inner()).abs();
        if hydration.position_count != input.open_count || locked_diff > HYDRATION_TOLERANCE {
            // The latch stays tripped: a failed seal must never silently
            // allow a later call to try again with different numbers.
            return Err(SealError::HydrationMismatch {
                expected_count: input.open_count,
                expected_locked: input.locked.to_string(),
                actual_count: hydration.position_count,
                actual_locked: hydration.total_locked.to_string(),
            });
        }

        tracing::info!(
            open_count = input.open_count,
            locked = %input.locked,
            available = %input.available,
            equity = %input.equity,
            run_id = %input.run_id,
            "reconciliation seal established"
        );

        *self.record.write() = Some(SealRecord {
            open_count: input.open_count,
            locked: input.locked,
            available: input.available,
            equity: input.equity,
            recovered_count: input.recovered_count,
            run_id: input.run_id,
            sealed_at_ms: input.sealed_at_ms,
            engine_mode: EngineMode::Stateful,
            open_position_ids: input.open_position_ids,
        });

        Ok(())
    }

    /// Read the frozen seal record. `None` before [`Self::seal`] succeeds.
    pub fn record(&self) -> Option<SealRecord> {
        self.record.read().clone()
    }

    /// Reject any attempt to overwrite locked capital while positions are
    /// still open. Called by the ledger before a capital rebuild effect.
    pub fn guard_capital_rebuild(&self, open_count: usize) -> Result<()> {
        if self.is_sealed() && open_count > 0 {
            return Err(SealError::CapitalRebuildWithOpenPositions { open_count });
        }
        Ok(())
    }

    /// Reject any attempt to move the engine out of `Stateful` mode.
    pub fn guard_engine_mode(&self, requested: EngineMode) -> Result<()> {
        if self.is_sealed() && requested == EngineMode::Stateless {
            return Err(SealError::EngineModeFrozen);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn input(open_count: usize, locked: Decimal) -> SealInput {
        SealInput {
            open_count,
            locked: Money::new(locked),
            available: Money::new(dec!(1000)),
            equity: Money::new(dec!(2000)),
            recovered_count: open_count,
            run_id: RunId::new(),
            sealed_at_ms: 1_000,
            open_position_ids: Vec::new(),
        }
    }

    #[test]
    fn seal_succeeds_on_matching_hydration() {
        let seal = ReconciliationSeal::new();
        let result = seal.seal(
            input(2, dec!(500)),
            HydrationResult {
                position_count: 2,
                total_locked: Money::new(dec!(500)),
            },
        );
        assert!(result.is_ok());
        assert!(seal.is_sealed());
        assert_eq!(seal.record().unwrap().open_count, 2);
    }

    #[test]
    fn seal_tolerates_penny_rounding() {
        let seal = ReconciliationSeal::new();
        let result = seal.seal(
            input(1, dec!(100.00)),
            HydrationResult {
                position_count: 1,
                total_locked: Money::new(dec!(100.005)),
            },
        );
        assert!(result.is_ok());
    }

    #[test]
    fn seal_rejects_count_mismatch() {
        let seal = ReconciliationSeal::new();
        let result = seal.seal(
            input(2, dec!(500)),
            HydrationResult {
                position_count: 1,
                total_locked: Money::new(dec!(500)),
            },
        );
        assert!(matches!(result, Err(SealError::HydrationMismatch { .. })));
        // A failed seal still trips the latch: a second attempt is rejected
        // as AlreadySealed, not as a fresh mismatch check.
        let second = seal.seal(
            input(1, dec!(500)),
            HydrationResult {
                position_count: 1,
                total_locked: Money::new(dec!(500)),
            },
        );
        assert!(matches!(second, Err(SealError::AlreadySealed)));
    }

    #[test]
    fn seal_rejects_locked_amount_beyond_tolerance() {
        let seal = ReconciliationSeal::new();
        let result = seal.seal(
            input(1, dec!(100)),
            HydrationResult {
                position_count: 1,
                total_locked: Money::new(dec!(100.50)),
            },
        );
        assert!(matches!(result, Err(SealError::HydrationMismatch { .. })));
    }

    #[test]
    fn second_seal_call_is_rejected() {
        let seal = ReconciliationSeal::new();
        seal.seal(
            input(0, dec!(0)),
            HydrationResult {
                position_count: 0,
                total_locked: Money::ZERO,
            },
        )
        .unwrap();

        let second = seal.seal(
            input(0, dec!(0)),
            HydrationResult {
                position_count: 0,
                total_locked: Money::ZERO,
            },
        );
        assert!(matches!(second, Err(SealError::AlreadySealed)));
    }

    #[test]
    fn capital_rebuild_with_open_positions_is_fatal() {
        let seal = ReconciliationSeal::new();
        seal.seal(
            input(1, dec!(100)),
            HydrationResult {
                position_count: 1,
                total_locked: Money::new(dec!(100)),
            },
        )
        .unwrap();

        let result = seal.guard_capital_rebuild(1);
        assert!(matches!(
            result,
            Err(SealError::CapitalRebuildWithOpenPositions { open_count: 1 })
        ));
        // No open positions: a rebuild is safe even post-seal.
        assert!(seal.guard_capital_rebuild(0).is_ok());
    }

    #[test]
    fn engine_mode_is_frozen_after_seal() {
        let seal = ReconciliationSeal::new();
        seal.seal(
            input(0, dec!(0)),
            HydrationResult {
                position_count: 0,
                total_locked: Money::ZERO,
            },
        )
        .unwrap();

        assert!(matches!(
            seal.guard_engine_mode(EngineMode::Stateless),
            Err(SealError::EngineModeFrozen)
        ));
        assert!(seal.guard_engine_mode(EngineMode::Stateful).is_ok());
    }

    #[test]
    fn record_is_unreadable_before_seal() {
        let seal = ReconciliationSeal::new();
        assert!(seal.record().is_none());
    }
}
