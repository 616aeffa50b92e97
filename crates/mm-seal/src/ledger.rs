//! The capital ledger: tracks locked/available/total equity and applies
//! ENTRY/EXIT effects transactionally.
//!
//! Mirrors the ordered hard-gate pattern the teacher uses for risk checks
//! (check, then mutate, never the reverse) so a rejected entry never
//! contaminates the ledger's counters.

use parking_lot::RwLock;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use mm_core::Money;

use crate::error::{Result, SealError};

/// Fraction of equity that must remain undeployed at all times.
pub const RESERVE_RATIO: Decimal = dec!(0.30);

/// Per-pool entry cap as a fraction of equity (checked on entry).
pub const PER_POOL_ENTRY_CAP: Decimal = dec!(0.20);

/// Per-pool steady-state hard cap as a fraction of equity.
pub const PER_POOL_STEADY_STATE_CAP: Decimal = dec!(0.18);

#[derive(Debug, Clone, Copy)]
struct Totals {
    locked: Money,
    available: Money,
    equity: Money,
}

/// Why an entry reservation was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveRejection {
    /// Would push deployed capital above `equity * (1 - RESERVE_RATIO)`.
    ReserveBreached,
    /// Size alone exceeds the per-pool entry cap.
    PerPoolCapExceeded,
}

/// The process-global capital ledger.
///
/// All mutation goes through [`Self::reserve_entry`] / [`Self::release_exit`]
/// so that the reserve and per-pool invariants (§3) can never be bypassed by
/// a direct field write.
#[derive(Debug)]
pub struct Ledger {
    totals: RwLock<Totals>,
}

impl Ledger {
    #[must_use]
    pub fn new(locked: Money, available: Money, equity: Money) -> Self {
        Self {
            totals: RwLock::new(Totals {
                locked,
                available,
                equity,
            }),
        }
    }

    pub fn locked_capital(&self) -> Money {
        self.totals.read().locked
    }

    pub fn available_capital(&self) -> Money {
        self.totals.read().available
    }

    pub fn equity(&self) -> Money {
        self.totals.read().equity
    }

    pub fn deployed_fraction(&self) -> Decimal {
        let t = self.totals.read();
        t.locked.fraction_of(t.equity).unwrap_or(Decimal::ZERO)
    }

    /// Check whether `size` could be reserved without mutating anything.
    pub fn can_reserve(&self, size: Money) -> std::result::Result<(), ReserveRejection> {
        let t = self.totals.read();
        if t.equity.is_zero() {
            return Err(ReserveRejection::ReserveBreached);
        }
        if size.fraction_of(t.equity).unwrap_or(Decimal::MAX) > PER_POOL_ENTRY_CAP {
            return Err(ReserveRejection::PerPoolCapExceeded);
        }
        let projected = t.locked + size;
        let max_deployed = t.equity * (Decimal::ONE - RESERVE_RATIO);
        if projected.inner() > max_deployed.inner() {
            return Err(ReserveRejection::ReserveBreached);
        }
        Ok(())
    }

    /// Atomically reserve capital for an ENTRY effect: reserve check then
    /// credit locked / debit available in one critical section.
    pub fn reserve_entry(&self, size: Money) -> std::result::Result<(), ReserveRejection> {
        let mut t = self.totals.write();
        if t.equity.is_zero() {
            return Err(ReserveRejection::ReserveBreached);
        }
        if size.fraction_of(t.equity).unwrap_or(Decimal::MAX) > PER_POOL_ENTRY_CAP {
            return Err(ReserveRejection::PerPoolCapExceeded);
        }
        let projected = t.locked + size;
        let max_deployed = t.equity * (Decimal::ONE - RESERVE_RATIO);
        if projected.inner() > max_deployed.inner() {
            return Err(ReserveRejection::ReserveBreached);
        }
        t.locked = projected;
        t.available = t.available - size;
        Ok(())
    }

    /// Atomically release capital for an EXIT effect.
    pub fn release_exit(&self, size: Money) {
        let mut t = self.totals.write();
        t.locked = Money::new((t.locked.inner() - size.inner()).max(Decimal::ZERO));
        t.available = t.available + size;
    }

    /// Rebuild the ledger's totals outright. Callers MUST check
    /// [`mm_seal::ReconciliationSeal::guard_capital_rebuild`] first; this
    /// method itself does not know about open-position counts.
    pub fn rebuild(&self, locked: Money, available: Money, equity: Money) -> Result<()> {
        if equity.is_negative() || locked.is_negative() || available.is_negative() {
            return Err(SealError::LedgerInvariant(
                "rebuild totals must be non-negative".to_string(),
            ));
        }
        *self.totals.write() = Totals {
            locked,
            available,
            equity,
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn reserve_guard_scenario_from_spec() {
        // Equity $10,000, deployed $6,500, attempt entry $600 -> rejected.
        let ledger = Ledger::new(Money::new(dec!(6500)), Money::new(dec!(3500)), Money::new(dec!(10000)));
        assert_eq!(
            ledger.can_reserve(Money::new(dec!(600))),
            Err(ReserveRejection::ReserveBreached)
        );
        // $400 entry reaches $6,900 <= $7,000 -> allowed.
        assert!(ledger.can_reserve(Money::new(dec!(400))).is_ok());
    }

    #[test]
    fn per_pool_cap_is_enforced_independent_of_reserve() {
        let ledger = Ledger::new(Money::ZERO, Money::new(dec!(10000)), Money::new(dec!(10000)));
        // 20% of 10,000 = 2,000; 2,001 breaches the per-pool cap even though
        // the reserve has ample room.
        assert_eq!(
            ledger.can_reserve(Money::new(dec!(2001))),
            Err(ReserveRejection::PerPoolCapExceeded)
        );
        assert!(ledger.can_reserve(Money::new(dec!(2000))).is_ok());
    }

    #[test]
    fn reserve_entry_mutates_only_on_success() {
        let ledger = Ledger::new(Money::ZERO, Money::new(dec!(1000)), Money::new(dec!(1000)));
        assert!(ledger.reserve_entry(Money::new(dec!(5000))).is_err());
        assert_eq!(ledger.locked_capital(), Money::ZERO);

        ledger.reserve_entry(Money::new(dec!(100))).unwrap();
        assert_eq!(ledger.locked_capital(), Money::new(dec!(100)));
        assert_eq!(ledger.available_capital(), Money::new(dec!(900)));
    }

    #[test]
    fn release_exit_never_drives_locked_negative() {
        let ledger = Ledger::new(Money::new(dec!(50)), Money::new(dec!(50)), Money::new(dec!(100)));
        ledger.release_exit(Money::new(dec!(500)));
        assert_eq!(ledger.locked_capital(), Money::ZERO);
    }
}
