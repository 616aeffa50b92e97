//! The "Prove-It" capital ramp: a pool only earns larger size after
//! demonstrating it can earn fees fast enough to justify the capital.

use crate::config::CapitalRampConfig;

/// The four sizing stages a pool moves through as it proves itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Probe,
    Tranche2,
    Tranche3,
    Cap,
}

impl Stage {
    fn next(self) -> Option<Stage> {
        match self {
            Stage::Probe => Some(Stage::Tranche2),
            Stage::Tranche2 => Some(Stage::Tranche3),
            Stage::Tranche3 => Some(Stage::Cap),
            Stage::Cap => None,
        }
    }
}

/// The target entry size for `stage` given `equity`, in plain currency
/// units (the caller wraps the result in `Money`).
pub fn stage_size(stage: Stage, equity: f64, config: &CapitalRampConfig) -> f64 {
    match stage {
        Stage::Probe => (equity * config.probe_pct).clamp(config.probe_floor, config.probe_cap),
        Stage::Tranche2 => equity * config.tranche2_pct,
        Stage::Tranche3 => equity * config.tranche3_pct,
        Stage::Cap => equity * config.cap_pct.min(config.per_pool_hard_cap_pct),
    }
}

/// Inputs the ramp needs to judge whether a pool has proven itself this
/// window.
#[derive(Debug, Clone, Copy)]
pub struct ProofContext {
    pub fees_accrued: f64,
    pub entry_cost: f64,
    pub expected_exit_cost: f64,
    pub normalized_fee_velocity_per_1000_per_hour: f64,
    pub consecutive_velocity_intervals: u32,
}

fn proof_met(ctx: &ProofContext, config: &CapitalRampConfig) -> bool {
    let fee_proof = ctx.fees_accrued >= config.proof_fee_fraction * (ctx.entry_cost + ctx.expected_exit_cost);
    let velocity_proof = ctx.normalized_fee_velocity_per_1000_per_hour
        >= config.proof_velocity_per_1000_per_hour
        && ctx.consecutive_velocity_intervals >= config.proof_velocity_consecutive_intervals;
    fee_proof || velocity_proof
}

/// Outcome of evaluating one pool's ramp window this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RampOutcome {
    StepUp(Stage),
    Hold,
    WindowExpired,
    Blacklisted,
}

/// Per-pool ramp state.
#[derive(Debug, Clone)]
pub struct RampState {
    pub stage: Stage,
    pub window_started_ms: i64,
    pub last_step_up_ms: Option<i64>,
    pub consecutive_failures: u32,
}

impl RampState {
    pub fn new(window_started_ms: i64) -> Self {
        Self {
            stage: Stage::Probe,
            window_started_ms,
            last_step_up_ms: None,
            consecutive_failures: 0,
        }
    }

    /// Evaluate this pool's proof window for the current cycle.
    pub fn evaluate(
        &mut self,
        proof: &ProofContext,
        now_ms: i64,
        config: &CapitalRampConfig,
    ) -> RampOutcome {
        if self.stage == Stage::Cap {
            return RampOutcome::Hold;
        }

        let window_elapsed_min = (now_ms - self.window_started_ms) / 60_000;

        if proof_met(proof, config) && window_elapsed_min >= config.proof_window_min_min {
            let dwell_ok = match self.last_step_up_ms {
                None => true,
                Some(last) => (now_ms - last) / 60_000 >= config.step_up_dwell_min,
            };
            if !dwell_ok {
                return RampOutcome::Hold;
            }
            if let Some(next) = self.stage.next() {
                self.stage = next;
                self.window_started_ms = now_ms;
                self.last_step_up_ms = Some(now_ms);
                self.consecutive_failures = 0;
                return RampOutcome::StepUp(next);
            }
            return RampOutcome::Hold;
        }

        if window_elapsed_min > config.proof_window_max_min {
            self.consecutive_failures += 1;
            self.window_started_ms = now_ms;
            if self.consecutive_failures >= config.consecutive_failures_for_blacklist {
                return RampOutcome::Blacklisted;
            }
            return RampOutcome::WindowExpired;
        }

        RampOutcome::Hold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CapitalRampConfig {
        CapitalRampConfig::default()
    }

    fn strong_proof() -> ProofContext {
        ProofContext {
            fees_accrued: 100.0,
            entry_cost: 10.0,
            expected_exit_cost: 10.0,
            normalized_fee_velocity_per_1000_per_hour: 0.0,
            consecutive_velocity_intervals: 0,
        }
    }

    fn weak_proof() -> ProofContext {
        ProofContext {
            fees_accrued: 0.0,
            entry_cost: 10.0,
            expected_exit_cost: 10.0,
            normalized_fee_velocity_per_1000_per_hour: 0.0,
            consecutive_velocity_intervals: 0,
        }
    }

    #[test]
    fn stage_size_respects_probe_floor_and_cap() {
        let config = config();
        assert_eq!(stage_size(Stage::Probe, 1_000.0, &config), 25.0);
        assert_eq!(stage_size(Stage::Probe, 1_000_000.0, &config), 150.0);
    }

    #[test]
    fn proof_steps_up_after_minimum_window() {
        let config = config();
        let mut state = RampState::new(0);
        let outcome = state.evaluate(&strong_proof(), 46 * 60_000, &config);
        assert_eq!(outcome, RampOutcome::StepUp(Stage::Tranche2));
    }

    #[test]
    fn step_up_respects_dwell_even_with_proof() {
        let config = config();
        let mut state = RampState::new(0);
        state.evaluate(&strong_proof(), 46 * 60_000, &config);
        assert_eq!(state.stage, Stage::Tranche2);
        // Immediately re-proving shouldn't step up again before dwell elapses.
        let outcome = state.evaluate(&strong_proof(), 46 * 60_000 + 60_000, &config);
        assert_eq!(outcome, RampOutcome::Hold);
    }

    #[test]
    fn window_expiry_without_proof_increments_failures() {
        let config = config();
        let mut state = RampState::new(0);
        let outcome = state.evaluate(&weak_proof(), 91 * 60_000, &config);
        assert_eq!(outcome, RampOutcome::WindowExpired);
        assert_eq!(state.consecutive_failures, 1);
    }

    #[test]
    fn three_consecutive_failures_blacklists() {
        let config = config();
        let mut state = RampState::new(0);
        for _ in 0..2 {
            state.evaluate(&weak_proof(), 91 * 60_000, &config);
        }
        let outcome = state.evaluate(&weak_proof(), 91 * 60_000, &config);
        assert_eq!(outcome, RampOutcome::Blacklisted);
    }

    #[test]
    fn cap_stage_never_steps_up_further() {
        let config = config();
        let mut state = RampState::new(0);
        state.stage = Stage::Cap;
        let outcome = state.evaluate(&strong_proof(), 1_000_000, &config);
        assert_eq!(outcome, RampOutcome::Hold);
    }
}
