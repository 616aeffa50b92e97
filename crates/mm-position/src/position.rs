//! The `Position` aggregate: everything the lifecycle, HOLD, exit
//! classifier, escape hatch and bleed guard need about a single open
//! position.

use mm_core::{Money, PoolId, PositionId, Regime, RollingStat};

use crate::lifecycle::{Lifecycle, LifecycleState};
use crate::telemetry::{FeeSnapshots, SuppressionWindow};

/// An open position against a pool.
///
/// Invariant: `hold_entry_ts_ms` is `Some` iff `lifecycle.state() ==
/// LifecycleState::Hold` (§3). Callers that transition the lifecycle are
/// responsible for keeping this field in sync; see [`Position::enter_hold`]
/// / [`Position::exit_hold`].
#[derive(Debug, Clone)]
pub struct Position {
    pub id: PositionId,
    pub pool_id: PoolId,
    pub entry_ts_ms: i64,
    pub entry_size: Money,
    pub entry_fee_velocity: f64,
    pub entry_regime: Regime,
    pub entry_score: f64,
    pub accumulated_fees: Money,
    pub rebalance_count: u32,
    pub last_rebalance_ms: Option<i64>,
    pub hold_entry_ts_ms: Option<i64>,
    pub lifecycle: Lifecycle,
    pub suppression_window: SuppressionWindow,
    pub fee_snapshots: FeeSnapshots,
    pub bad_sample_counter: u32,
    pub bleed_bad_window_count: u32,
    pub telemetry: RollingStat,
}

impl Position {
    pub fn new(
        id: PositionId,
        pool_id: PoolId,
        entry_ts_ms: i64,
        entry_size: Money,
        entry_fee_velocity: f64,
        entry_regime: Regime,
        entry_score: f64,
    ) -> Self {
        Self {
            id,
            pool_id,
            entry_ts_ms,
            entry_size,
            entry_fee_velocity,
            entry_regime,
            entry_score,
            accumulated_fees: Money::ZERO,
            rebalance_count: 0,
            last_rebalance_ms: None,
            hold_entry_ts_ms: None,
            lifecycle: Lifecycle::new(),
            suppression_window: SuppressionWindow::new(),
            fee_snapshots: FeeSnapshots::new(),
            bad_sample_counter: 0,
            bleed_bad_window_count: 0,
            telemetry: RollingStat::default(),
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    pub fn enter_hold(&mut self, at_ms: i64) -> crate::error::PositionResult<()> {
        self.lifecycle.enter_hold(at_ms)?;
        self.hold_entry_ts_ms = Some(at_ms);
        Ok(())
    }

    pub fn exit_hold(&mut self, reason: &str, at_ms: i64) -> crate::error::PositionResult<()> {
        self.lifecycle.exit_hold_to_active(reason, at_ms)?;
        self.hold_entry_ts_ms = None;
        Ok(())
    }

    pub fn record_rebalance(&mut self, at_ms: i64) {
        self.rebalance_count += 1;
        self.last_rebalance_ms = Some(at_ms);
    }

    pub fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms - self.entry_ts_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_position() -> Position {
        Position::new(
            PositionId::new(),
            PoolId::new("pool1".to_string()),
            0,
            Money::new(dec!(100)),
            1.0,
            Regime::Neutral,
            50.0,
        )
    }

    #[test]
    fn new_position_starts_active_with_no_hold_timestamp() {
        let position = sample_position();
        assert_eq!(position.state(), LifecycleState::Active);
        assert!(position.hold_entry_ts_ms.is_none());
    }

    #[test]
    fn entering_and_exiting_hold_keeps_timestamp_in_sync() {
        let mut position = sample_position();
        position.enter_hold(100).unwrap();
        assert_eq!(position.hold_entry_ts_ms, Some(100));
        position.exit_hold("low-movement", 200).unwrap();
        assert!(position.hold_entry_ts_ms.is_none());
    }

    #[test]
    fn record_rebalance_increments_count_and_timestamp() {
        let mut position = sample_position();
        position.record_rebalance(500);
        position.record_rebalance(900);
        assert_eq!(position.rebalance_count, 2);
        assert_eq!(position.last_rebalance_ms, Some(900));
    }
}
