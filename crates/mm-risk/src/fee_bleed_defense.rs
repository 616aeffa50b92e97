//! Fee-bleed defense: a portfolio-level throttle that activates when recent
//! closed trades are systematically losing to fees and slippage, then
//! applies multipliers to every downstream sizing/gating decision until the
//! portfolio proves it has recovered.

use std::collections::VecDeque;

const TRADE_WINDOW: usize = 20;

pub const MIN_TRADES_TO_ACTIVATE: usize = 3;
pub const MAX_NET_PNL_TO_ACTIVATE: f64 = -5.0;
pub const MIN_COST_RATIO_TO_ACTIVATE: f64 = 0.70;
pub const MIN_CYCLES_WITHOUT_POSITIVE_EV: u32 = 10;

pub const RECOVERY_MIN_DWELL_MS: i64 = 10 * 60 * 1000;
pub const RECOVERY_CONSECUTIVE_PROFITABLE_TRADES: u32 = 3;
pub const RECOVERY_TIMEOUT_MS: i64 = 60 * 60 * 1000;

pub const EV_GATE_MULTIPLIER: f64 = 1.5;
pub const ENTRY_COOLDOWN_MULTIPLIER: f64 = 2.0;
pub const POSITION_SIZE_MULTIPLIER: f64 = 0.60;
pub const EXIT_THRESHOLD_MULTIPLIER: f64 = 1.25;

/// Outcome of a single closed trade, as recorded for the rolling window.
#[derive(Debug, Clone, Copy)]
pub struct TradeOutcome {
    pub gross_pnl: f64,
    pub net_pnl: f64,
    pub fees: f64,
    pub slippage: f64,
    pub expected_ev: f64,
}

impl TradeOutcome {
    fn is_positive_ev(&self) -> bool {
        self.expected_ev > 0.0
    }
}

/// Why the defense deactivated, recorded for telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryReason {
    Recovery,
    PositiveEvTrade,
    Timeout,
}

/// The multipliers a caller applies to its own decisions while the defense
/// is active. Inert (all 1.0 / identity) while inactive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DefenseMultipliers {
    pub ev_gate: f64,
    pub entry_cooldown: f64,
    pub position_size: f64,
    pub exit_threshold: f64,
}

impl DefenseMultipliers {
    pub const INACTIVE: Self = Self {
        ev_gate: 1.0,
        entry_cooldown: 1.0,
        position_size: 1.0,
        exit_threshold: 1.0,
    };

    pub const ACTIVE: Self = Self {
        ev_gate: EV_GATE_MULTIPLIER,
        entry_cooldown: ENTRY_COOLDOWN_MULTIPLIER,
        position_size: POSITION_SIZE_MULTIPLIER,
        exit_threshold: EXIT_THRESHOLD_MULTIPLIER,
    };
}

/// Portfolio-level fee-bleed defense state.
#[derive(Debug)]
pub struct FeeBleedDefense {
    trades: VecDeque<TradeOutcome>,
    cycles_without_positive_ev: u32,
    active_since_ms: Option<i64>,
    consecutive_profitable_since_activation: u32,
}

impl Default for FeeBleedDefense {
    fn default() -> Self {
        Self::new()
    }
}

impl FeeBleedDefense {
    pub fn new() -> Self {
        Self {
            trades: VecDeque::with_capacity(TRADE_WINDOW),
            cycles_without_positive_ev: 0,
            active_since_ms: None,
            consecutive_profitable_since_activation: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active_since_ms.is_some()
    }

    pub fn multipliers(&self) -> DefenseMultipliers {
        if self.is_active() {
            DefenseMultipliers::ACTIVE
        } else {
            DefenseMultipliers::INACTIVE
        }
    }

    /// Record one closed trade. Call once per trade close, before
    /// `evaluate` for the cycle.
    pub fn record_trade(&mut self, outcome: TradeOutcome) {
        if self.trades.len() == TRADE_WINDOW {
            self.trades.pop_front();
        }
        self.trades.push_back(outcome);

        if outcome.is_positive_ev() {
            self.cycles_without_positive_ev = 0;
            if self.is_active() {
                self.consecutive_profitable_since_activation += 1;
            }
        } else {
            self.cycles_without_positive_ev += 1;
            if self.is_active() {
                self.consecutive_profitable_since_activation = 0;
            }
        }
    }

    /// Call once per cycle to update activation/recovery state.
    pub fn evaluate(&mut self, now_ms: i64) -> Option<RecoveryReason> {
        if self.is_active() {
            return self.evaluate_recovery(now_ms);
        }
        if self.activation_conditions_hold() {
            self.active_since_ms = Some(now_ms);
            self.consecutive_profitable_since_activation = 0;
        }
        None
    }

    fn activation_conditions_hold(&self) -> bool {
        if self.trades.len() < MIN_TRADES_TO_ACTIVATE {
            return false;
        }
        let net_pnl: f64 = self.trades.iter().map(|t| t.net_pnl).sum();
        if net_pnl >= MAX_NET_PNL_TO_ACTIVATE {
            return false;
        }
        let cost: f64 = self.trades.iter().map(|t| t.fees + t.slippage).sum();
        let cost_ratio = cost / net_pnl.abs().max(f64::EPSILON);
        if cost_ratio < MIN_COST_RATIO_TO_ACTIVATE {
            return false;
        }
        self.cycles_without_positive_ev >= MIN_CYCLES_WITHOUT_POSITIVE_EV
    }

    fn evaluate_recovery(&mut self, now_ms: i64) -> Option<RecoveryReason> {
        let since = self.active_since_ms?;
        let dwell_elapsed = now_ms - since;
        if dwell_elapsed < RECOVERY_MIN_DWELL_MS {
            return None;
        }

        if self.consecutive_profitable_since_activation >= RECOVERY_CONSECUTIVE_PROFITABLE_TRADES
        {
            self.deactivate();
            return Some(RecoveryReason::Recovery);
        }

        if let Some(last) = self.trades.back() {
            if last.is_positive_ev() {
                self.deactivate();
                return Some(RecoveryReason::PositiveEvTrade);
            }
        }

        if dwell_elapsed >= RECOVERY_TIMEOUT_MS {
            self.deactivate();
            return Some(RecoveryReason::Timeout);
        }

        None
    }

    fn deactivate(&mut self) {
        self.active_since_ms = None;
        self.consecutive_profitable_since_activation = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn losing_trade() -> TradeOutcome {
        TradeOutcome {
            gross_pnl: -3.0,
            net_pnl: -3.0,
            fees: 2.0,
            slippage: 1.0,
            expected_ev: -0.1,
        }
    }

    #[test]
    fn inactive_defense_applies_identity_multipliers() {
        let defense = FeeBleedDefense::new();
        assert_eq!(defense.multipliers(), DefenseMultipliers::INACTIVE);
    }

    #[test]
    fn activates_when_all_conditions_hold() {
        let mut defense = FeeBleedDefense::new();
        for _ in 0..10 {
            defense.record_trade(losing_trade());
        }
        assert!(defense.evaluate(0).is_none());
        for _ in 0..3 {
            defense.record_trade(losing_trade());
        }
        defense.evaluate(0);
        assert!(defense.is_active());
        assert_eq!(defense.multipliers(), DefenseMultipliers::ACTIVE);
    }

    #[test]
    fn recovery_respects_minimum_dwell() {
        let mut defense = FeeBleedDefense::new();
        for _ in 0..13 {
            defense.record_trade(losing_trade());
        }
        defense.evaluate(0);
        assert!(defense.is_active());

        // Three profitable trades immediately, but dwell hasn't elapsed.
        let profitable = TradeOutcome {
            gross_pnl: 2.0,
            net_pnl: 2.0,
            fees: 0.1,
            slippage: 0.0,
            expected_ev: 1.0,
        };
        for _ in 0..3 {
            defense.record_trade(profitable);
        }
        assert!(defense.evaluate(1_000).is_none());
        assert!(defense.is_active());

        let reason = defense.evaluate(RECOVERY_MIN_DWELL_MS + 1_000);
        assert_eq!(reason, Some(RecoveryReason::Recovery));
        assert!(!defense.is_active());
    }

    #[test]
    fn timeout_deactivates_after_an_hour() {
        let mut defense = FeeBleedDefense::new();
        for _ in 0..13 {
            defense.record_trade(losing_trade());
        }
        defense.evaluate(0);
        let reason = defense.evaluate(RECOVERY_TIMEOUT_MS + 1);
        assert_eq!(reason, Some(RecoveryReason::Timeout));
    }
}
