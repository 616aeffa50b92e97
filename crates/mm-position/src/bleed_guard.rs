//! Bleed guard: exits a position when unrealized losses are outrunning fee
//! accrual, rather than waiting indefinitely for fees to "catch up".

use mm_core::Regime;

/// Regime-tiered minimum hold before a bleed exit is even considered.
/// BEAR reacts fastest (shortest tier), BULL is most patient (longest
/// tier), NEUTRAL sits in between.
pub const MIN_HOLD_BEAR_MS: i64 = 10 * 60 * 1000;
pub const MIN_HOLD_NEUTRAL_MS: i64 = 20 * 60 * 1000;
pub const MIN_HOLD_BULL_MS: i64 = 30 * 60 * 1000;

pub const LOSS_RATE_MULTIPLIER: f64 = 1.5;
pub const FEE_VELOCITY_DECAY_FRACTION: f64 = 0.50;
pub const CONSECUTIVE_WINDOWS_REQUIRED: u32 = 3;
pub const POOL_COOLDOWN_MS: i64 = 6 * 60 * 60 * 1000;

pub fn min_hold_ms(regime: Regime) -> i64 {
    match regime {
        Regime::Bear => MIN_HOLD_BEAR_MS,
        Regime::Neutral => MIN_HOLD_NEUTRAL_MS,
        Regime::Bull => MIN_HOLD_BULL_MS,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BleedContext {
    pub entry_ts_ms: i64,
    pub now_ms: i64,
    pub regime: Regime,
    pub unrealized_pnl: f64,
    pub loss_rate_per_hour: f64,
    pub fee_rate_per_hour: f64,
    pub fee_velocity: f64,
    pub entry_fee_velocity: f64,
    pub bad_window_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BleedExitReason {
    SustainedBleed,
}

#[derive(Debug, Clone, Copy)]
pub struct BleedEvaluation {
    pub should_exit: bool,
    pub reason: Option<BleedExitReason>,
    /// The bad-window counter the caller should persist for next cycle.
    pub next_bad_window_count: u32,
}

/// Evaluate the bleed guard's five ordered conditions for one cycle.
pub fn evaluate(ctx: &BleedContext) -> BleedEvaluation {
    if ctx.now_ms - ctx.entry_ts_ms < min_hold_ms(ctx.regime) {
        return BleedEvaluation {
            should_exit: false,
            reason: None,
            next_bad_window_count: 0,
        };
    }

    let bleeding_this_window = ctx.unrealized_pnl < 0.0
        && ctx.loss_rate_per_hour > ctx.fee_rate_per_hour * LOSS_RATE_MULTIPLIER
        && ctx.fee_velocity < ctx.entry_fee_velocity * FEE_VELOCITY_DECAY_FRACTION;

    if !bleeding_this_window {
        return BleedEvaluation {
            should_exit: false,
            reason: None,
            next_bad_window_count: 0,
        };
    }

    let next_count = ctx.bad_window_count + 1;
    if next_count >= CONSECUTIVE_WINDOWS_REQUIRED {
        return BleedEvaluation {
            should_exit: true,
            reason: Some(BleedExitReason::SustainedBleed),
            next_bad_window_count: 0,
        };
    }

    BleedEvaluation {
        should_exit: false,
        reason: None,
        next_bad_window_count: next_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_ctx() -> BleedContext {
        BleedContext {
            entry_ts_ms: 0,
            now_ms: MIN_HOLD_NEUTRAL_MS + 1,
            regime: Regime::Neutral,
            unrealized_pnl: -4.0,
            loss_rate_per_hour: 6.0,
            fee_rate_per_hour: 2.0,
            fee_velocity: 0.5,
            entry_fee_velocity: 2.0,
            bad_window_count: 0,
        }
    }

    #[test]
    fn forbidden_before_min_hold() {
        let mut ctx = base_ctx();
        ctx.now_ms = 1_000;
        ctx.bad_window_count = 2;
        let eval = evaluate(&ctx);
        assert!(!eval.should_exit);
        assert_eq!(eval.next_bad_window_count, 0);
    }

    #[test]
    fn profitable_position_never_triggers() {
        let mut ctx = base_ctx();
        ctx.unrealized_pnl = 1.0;
        let eval = evaluate(&ctx);
        assert!(!eval.should_exit);
    }

    #[test]
    fn scenario_from_spec_fires_on_third_window() {
        let mut ctx = base_ctx();
        ctx.bad_window_count = 2;
        let eval = evaluate(&ctx);
        assert!(eval.should_exit);
        assert_eq!(eval.reason, Some(BleedExitReason::SustainedBleed));
    }

    #[test]
    fn first_bad_window_only_increments_counter() {
        let ctx = base_ctx();
        let eval = evaluate(&ctx);
        assert!(!eval.should_exit);
        assert_eq!(eval.next_bad_window_count, 1);
    }

    #[test]
    fn loss_rate_below_multiplier_does_not_trigger() {
        let mut ctx = base_ctx();
        ctx.loss_rate_per_hour = 2.5;
        let eval = evaluate(&ctx);
        assert!(!eval.should_exit);
        assert_eq!(eval.next_bad_window_count, 0);
    }

    #[test]
    fn min_hold_is_regime_tiered() {
        assert_eq!(min_hold_ms(Regime::Bear), MIN_HOLD_BEAR_MS);
        assert_eq!(min_hold_ms(Regime::Neutral), MIN_HOLD_NEUTRAL_MS);
        assert_eq!(min_hold_ms(Regime::Bull), MIN_HOLD_BULL_MS);
    }
}
