//! Escape hatch: three independent forced-exit conditions that operate on a
//! position already stuck in EXIT_TRIGGERED, guaranteeing it eventually
//! leaves even if every individual exit attempt keeps getting suppressed.

pub const TTL_MS: i64 = 45 * 60 * 1000;
pub const SUPPRESSION_CAP: usize = 60;
pub const MIN_FEE_VELOCITY_PER_HOUR: f64 = 0.01;
pub const MAX_TIME_TO_COST_TARGET_MIN: f64 = 90.0;

/// Why the hatch forced an exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForcedExitReason {
    Ttl,
    SuppressCap,
    EconomicStale,
}

impl ForcedExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ttl => "FORCED_EXIT_TTL",
            Self::SuppressCap => "FORCED_EXIT_SUPPRESS_CAP",
            Self::EconomicStale => "FORCED_EXIT_ECONOMIC_STALE",
        }
    }
}

/// The dashboard-facing coarse exit state the hatch also reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitState {
    Hold,
    ExitTriggered,
    ForcedExitPending,
}

#[derive(Debug, Clone, Copy)]
pub struct EscapeHatchContext {
    pub exit_triggered_at_ms: i64,
    pub now_ms: i64,
    pub suppression_count_last_30min: usize,
    pub bad_sample_counter: u32,
    pub bad_sample_max: u32,
    pub fee_velocity_per_hour: Option<f64>,
    pub cost_target: f64,
    pub fees_accrued: f64,
}

/// Evaluate the three forced-exit conditions in the order they're
/// documented; the first one to fire wins (they are not mutually exclusive
/// in principle, but only one reason needs to be reported).
pub fn evaluate(ctx: &EscapeHatchContext) -> Option<ForcedExitReason> {
    if ctx.now_ms - ctx.exit_triggered_at_ms > TTL_MS {
        return Some(ForcedExitReason::Ttl);
    }

    if ctx.suppression_count_last_30min >= SUPPRESSION_CAP {
        return Some(ForcedExitReason::SuppressCap);
    }

    if ctx.bad_sample_counter >= ctx.bad_sample_max && is_economically_stale(ctx) {
        return Some(ForcedExitReason::EconomicStale);
    }

    None
}

fn is_economically_stale(ctx: &EscapeHatchContext) -> bool {
    let remaining = (ctx.cost_target - ctx.fees_accrued).max(0.0);
    let time_to_target_min = match ctx.fee_velocity_per_hour {
        Some(v) if v >= MIN_FEE_VELOCITY_PER_HOUR => Some(remaining / v * 60.0),
        _ => None,
    };
    match time_to_target_min {
        None => true,
        Some(minutes) => minutes > MAX_TIME_TO_COST_TARGET_MIN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_ctx() -> EscapeHatchContext {
        EscapeHatchContext {
            exit_triggered_at_ms: 0,
            now_ms: 60_000,
            suppression_count_last_30min: 0,
            bad_sample_counter: 0,
            bad_sample_max: 5,
            fee_velocity_per_hour: Some(1.0),
            cost_target: 2.0,
            fees_accrued: 0.5,
        }
    }

    #[test]
    fn no_conditions_fire_on_a_healthy_position() {
        assert!(evaluate(&base_ctx()).is_none());
    }

    #[test]
    fn ttl_fires_after_forty_five_minutes() {
        let mut ctx = base_ctx();
        ctx.now_ms = TTL_MS + 1;
        assert_eq!(evaluate(&ctx), Some(ForcedExitReason::Ttl));
    }

    #[test]
    fn suppression_cap_fires_at_sixty_events() {
        let mut ctx = base_ctx();
        ctx.suppression_count_last_30min = 60;
        assert_eq!(evaluate(&ctx), Some(ForcedExitReason::SuppressCap));
    }

    #[test]
    fn economic_stale_fires_on_infinite_time_to_target() {
        let mut ctx = base_ctx();
        ctx.bad_sample_counter = 5;
        ctx.fee_velocity_per_hour = Some(0.005);
        assert_eq!(evaluate(&ctx), Some(ForcedExitReason::EconomicStale));
    }

    #[test]
    fn economic_stale_fires_past_ninety_minutes() {
        let mut ctx = base_ctx();
        ctx.bad_sample_counter = 5;
        ctx.fee_velocity_per_hour = Some(0.5);
        ctx.cost_target = 10.0;
        ctx.fees_accrued = 0.0;
        // remaining 10 / velocity 0.5/hr = 20h = 1200min > 90min
        assert_eq!(evaluate(&ctx), Some(ForcedExitReason::EconomicStale));
    }

    #[test]
    fn economic_stale_requires_bad_sample_counter_at_max() {
        let mut ctx = base_ctx();
        ctx.bad_sample_counter = 1;
        ctx.fee_velocity_per_hour = Some(0.001);
        assert!(evaluate(&ctx).is_none());
    }
}
