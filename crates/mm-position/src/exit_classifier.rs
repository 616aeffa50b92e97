//! Exit classifier: decides whether a candidate exit reason code is RISK
//! (non-suppressible) or NOISE (suppressible only in HOLD).
//!
//! Defaults to RISK for anything not explicitly mapped to NOISE — a
//! fail-safe choice, since misclassifying a real risk as noise is the
//! expensive mistake.

use mm_core::Regime;

use crate::hold::HoldExitReason;

pub const MIGRATION_SLOPE_RISK_THRESHOLD_PER_MIN: f64 = 0.01;
pub const SCORE_DECAY_RISK_FRACTION: f64 = 0.50;
pub const SCORE_FLOOR_RISK: f64 = 15.0;
pub const SCORE_DECAY_NOISE_FRACTION: f64 = 0.15;

/// Closed set of exit reason codes a caller can hand to [`classify`]. Every
/// producer of a candidate exit (HOLD mode today, an operator kill switch or
/// other future caller) must map its own reason into one of these variants
/// rather than a free-text string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExitReasonCode {
    MigrationSlopeExceeded,
    ExpectedValueNegative,
    AdverseRegimeFlip,
    ScoreBelowFloor,
    DurationCapExceeded,
    LowMovement,
    MinorVolatility,
    OperatorKillSwitch,
}

impl ExitReasonCode {
    /// Stable label for logs and telemetry. Not used for classification.
    pub fn label(self) -> &'static str {
        match self {
            ExitReasonCode::MigrationSlopeExceeded => "migration-slope-exceeded",
            ExitReasonCode::ExpectedValueNegative => "expected-value-negative",
            ExitReasonCode::AdverseRegimeFlip => "adverse-regime-flip",
            ExitReasonCode::ScoreBelowFloor => "score-below-floor",
            ExitReasonCode::DurationCapExceeded => "duration-cap-exceeded",
            ExitReasonCode::LowMovement => "low-movement",
            ExitReasonCode::MinorVolatility => "minor-volatility",
            ExitReasonCode::OperatorKillSwitch => "operator-kill-switch",
        }
    }
}

impl From<HoldExitReason> for ExitReasonCode {
    fn from(reason: HoldExitReason) -> Self {
        match reason {
            HoldExitReason::MigrationSlopeExceeded => ExitReasonCode::MigrationSlopeExceeded,
            HoldExitReason::ExpectedValueNegative => ExitReasonCode::ExpectedValueNegative,
            HoldExitReason::AdverseRegimeFlip => ExitReasonCode::AdverseRegimeFlip,
            HoldExitReason::ScoreBelowFloor => ExitReasonCode::ScoreBelowFloor,
            HoldExitReason::DurationCapExceeded => ExitReasonCode::DurationCapExceeded,
        }
    }
}

/// RISK (non-suppressible) or NOISE (suppressible only while in HOLD).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Risk,
    Noise,
}

/// The specific RISK condition that fired, when classification is RISK.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskType {
    NegativeEv,
    AdverseRegimeFlip,
    MigrationSlopeExceeded,
    KillKeyword,
    ScoreDecay,
}

#[derive(Debug, Clone, Copy)]
pub struct ClassifierContext {
    pub ev: f64,
    pub entry_regime: Regime,
    pub current_regime: Regime,
    pub migration_slope_per_min: f64,
    pub entry_score: f64,
    pub current_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassificationResult {
    pub classification: Classification,
    pub risk_type: Option<RiskType>,
    pub can_suppress: bool,
    pub reason: ExitReasonCode,
}

/// Classify a candidate exit reason code against the position's current
/// telemetry context. The numeric conditions (EV, regime flip, migration
/// slope, score decay) are evaluated first and always win; `reason` only
/// breaks the tie for the kill-switch case and the two reasons known to be
/// NOISE on their own.
pub fn classify(reason: ExitReasonCode, ctx: &ClassifierContext) -> ClassificationResult {
    if let Some(risk_type) = risk_type(reason, ctx) {
        return ClassificationResult {
            classification: Classification::Risk,
            risk_type: Some(risk_type),
            can_suppress: false,
            reason,
        };
    }

    let score_decay = score_decay_fraction(ctx);
    let is_known_noise = score_decay <= SCORE_DECAY_NOISE_FRACTION
        || matches!(reason, ExitReasonCode::LowMovement | ExitReasonCode::MinorVolatility);

    if is_known_noise {
        ClassificationResult {
            classification: Classification::Noise,
            risk_type: None,
            can_suppress: true,
            reason,
        }
    } else {
        // Fail-safe default: reasons not in the NOISE table are RISK.
        ClassificationResult {
            classification: Classification::Risk,
            risk_type: Some(RiskType::ScoreDecay),
            can_suppress: false,
            reason,
        }
    }
}

fn risk_type(reason: ExitReasonCode, ctx: &ClassifierContext) -> Option<RiskType> {
    if ctx.ev < 0.0 {
        return Some(RiskType::NegativeEv);
    }
    if Regime::is_adverse_flip(ctx.entry_regime, ctx.current_regime) {
        return Some(RiskType::AdverseRegimeFlip);
    }
    if ctx.migration_slope_per_min.abs() > MIGRATION_SLOPE_RISK_THRESHOLD_PER_MIN {
        return Some(RiskType::MigrationSlopeExceeded);
    }
    if reason == ExitReasonCode::OperatorKillSwitch {
        return Some(RiskType::KillKeyword);
    }
    let score_decay = score_decay_fraction(ctx);
    if score_decay > SCORE_DECAY_RISK_FRACTION || ctx.current_score < SCORE_FLOOR_RISK {
        return Some(RiskType::ScoreDecay);
    }
    None
}

fn score_decay_fraction(ctx: &ClassifierContext) -> f64 {
    if ctx.entry_score <= 0.0 {
        return 0.0;
    }
    ((ctx.entry_score - ctx.current_score) / ctx.entry_score).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_ctx() -> ClassifierContext {
        ClassifierContext {
            ev: 1.0,
            entry_regime: Regime::Neutral,
            current_regime: Regime::Neutral,
            migration_slope_per_min: 0.001,
            entry_score: 50.0,
            current_score: 48.0,
        }
    }

    #[test]
    fn negative_ev_is_risk() {
        let mut ctx = base_ctx();
        ctx.ev = -0.5;
        let result = classify(ExitReasonCode::LowMovement, &ctx);
        assert_eq!(result.classification, Classification::Risk);
        assert_eq!(result.risk_type, Some(RiskType::NegativeEv));
        assert!(!result.can_suppress);
    }

    #[test]
    fn kill_switch_is_risk_regardless_of_other_fields() {
        let ctx = base_ctx();
        let result = classify(ExitReasonCode::OperatorKillSwitch, &ctx);
        assert_eq!(result.risk_type, Some(RiskType::KillKeyword));
    }

    #[test]
    fn low_movement_with_small_decay_is_noise() {
        let ctx = base_ctx();
        let result = classify(ExitReasonCode::LowMovement, &ctx);
        assert_eq!(result.classification, Classification::Noise);
        assert!(result.can_suppress);
    }

    #[test]
    fn reason_outside_noise_table_defaults_to_risk() {
        let mut ctx = base_ctx();
        // 20% decay: not enough to trip the >50% risk rule, too much for
        // the <=15% noise rule, and the reason code isn't in the NOISE set.
        ctx.entry_score = 50.0;
        ctx.current_score = 40.0;
        let result = classify(ExitReasonCode::ScoreBelowFloor, &ctx);
        assert_eq!(result.classification, Classification::Risk);
        assert_eq!(result.risk_type, Some(RiskType::ScoreDecay));
    }

    #[test]
    fn score_decay_past_fifty_percent_is_risk() {
        let mut ctx = base_ctx();
        ctx.current_score = 20.0;
        ctx.entry_score = 50.0;
        let result = classify(ExitReasonCode::LowMovement, &ctx);
        assert_eq!(result.classification, Classification::Risk);
        assert_eq!(result.risk_type, Some(RiskType::ScoreDecay));
    }

    #[test]
    fn score_below_floor_is_risk_even_with_low_decay() {
        let mut ctx = base_ctx();
        ctx.entry_score = 16.0;
        ctx.current_score = 14.0;
        let result = classify(ExitReasonCode::LowMovement, &ctx);
        assert_eq!(result.risk_type, Some(RiskType::ScoreDecay));
    }

    #[test]
    fn hold_exit_reason_maps_onto_matching_exit_reason_code() {
        assert_eq!(
            ExitReasonCode::from(HoldExitReason::AdverseRegimeFlip),
            ExitReasonCode::AdverseRegimeFlip
        );
        assert_eq!(
            ExitReasonCode::from(HoldExitReason::DurationCapExceeded),
            ExitReasonCode::DurationCapExceeded
        );
    }
}
