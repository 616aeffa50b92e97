//! The single evaluation cycle.
//!
//! One `Scheduler` owns everything a cycle touches: it loads candidate pools
//! from the registry, scores them with the Opportunity Density Detector,
//! confirms a spike (or falls back to rare convergence) before consulting
//! the capital ramp for entries, then walks every open position
//! through the rebalance/exit stack in the order their data dependencies
//! demand — fee-bleed defense first (its multipliers feed the exit
//! classifier's EV gate and the ramp's sizing), then per position:
//! rebalance controller, bleed guard, hold/exit classification, and finally
//! the escape hatch for anything already stuck in EXIT_TRIGGERED.
//!
//! No HTTP/WS/on-chain client lives here. Per-position market inputs
//! (unrealized pnl, fee velocity, migration slope, EV) arrive each cycle as
//! a caller-supplied [`PositionSignal`], the same boundary role
//! `PoolSnapshotSource` plays for pool-level data.

use std::collections::HashMap;

use uuid::Uuid;

use mm_capital::ramp::stage_size;
use mm_capital::{CapitalRampConfig, ProofContext, RampOutcome, RampState, Stage};
use mm_core::{FlowState, Money, PoolId, PositionId, Regime};
use mm_detector::{Assessment, DetectorConfig, OpportunityDensityDetector, ScoringContext};
use mm_position::exit_classifier::{self, Classification, ClassifierContext, ExitReasonCode, RiskType};
use mm_position::hold::{self, HoldContext, HoldExitReason};
use mm_position::lifecycle::{LifecycleState, TransitionCause};
use mm_position::{bleed_guard, escape_hatch};
use mm_position::Position;
use mm_rebalance::trigger::{Trigger, TriggerInputs};
use mm_rebalance::{controller, RebalanceConfig, RebalanceOutcome};
use mm_registry::PoolRegistry;
use mm_risk::{DefenseMultipliers, FeeBleedDefense};
use mm_seal::Ledger;

use crate::error::AppResult;

/// Matches the `bad_sample_max` used in the escape hatch's own fixtures:
/// how many consecutive stale/degenerate samples a position tolerates
/// before its economic-stale check is even armed.
const BAD_SAMPLE_MAX: u32 = 5;

/// Per-position market inputs the scheduler needs this cycle. Supplied by
/// whatever prices and marks positions upstream; no valuation model ships
/// in this workspace.
#[derive(Debug, Clone, Copy)]
pub struct PositionSignal {
    pub current_regime: Regime,
    pub current_score: f64,
    pub ev: f64,
    pub unrealized_pnl: f64,
    pub loss_rate_per_hour: f64,
    pub fee_rate_per_hour: f64,
    pub current_fee_velocity: f64,
    pub migration_slope_per_min: f64,
    pub price_movement_pct_per_hour: f64,
    pub normalized_fee_intensity: f64,
    pub expected_net_value: f64,
    pub cost_target: f64,
    pub neighbor_max_fee_velocity: f64,
    pub rolling_peak_fee_velocity: f64,
    pub external_liquidity_in_range_change_pct: f64,
    pub adjacent_bin_revisit_rate_change_pct: f64,
    pub tx_cost: f64,
}

/// Per-pool inputs the capital ramp needs this cycle, beyond the registry's
/// own rolling stats.
#[derive(Debug, Clone, Copy)]
pub struct PoolProofSignal {
    pub fees_accrued: f64,
    pub entry_cost: f64,
    pub expected_exit_cost: f64,
    pub normalized_fee_velocity_per_1000_per_hour: f64,
    pub consecutive_velocity_intervals: u32,
    pub has_micro_metrics: bool,
    pub bootstrap: bool,
    pub ev: f64,
}

#[derive(Debug, Clone)]
pub struct EntryDecision {
    pub pool: PoolId,
    pub size: Money,
    pub stage: Stage,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct RebalanceDecision {
    pub position: PositionId,
    pub trigger: Trigger,
    pub new_bin_config: String,
    pub cost_estimate: f64,
    pub expected_gain: f64,
}

#[derive(Debug, Clone)]
pub struct ExitDecision {
    pub position: PositionId,
    pub reason: String,
    pub classification: Option<Classification>,
    pub risk_type: Option<RiskType>,
}

#[derive(Debug, Clone)]
pub struct DefenseStatus {
    pub active: bool,
    pub multipliers: DefenseMultipliers,
    pub deactivation_reason: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CycleOutcome {
    pub entries: Vec<EntryDecision>,
    pub rebalances: Vec<RebalanceDecision>,
    pub exits: Vec<ExitDecision>,
    pub defense: Option<DefenseStatus>,
}

/// Owns one evaluation cycle. The registry, ledger and defense throttle are
/// process-global state that outlives any single position; ramp state is
/// tracked per pool address here because it is a capital-ramp-owned
/// judgment, not raw registry data.
pub struct Scheduler {
    registry: PoolRegistry,
    ledger: std::sync::Arc<Ledger>,
    detector: OpportunityDensityDetector,
    defense: FeeBleedDefense,
    ramp_states: HashMap<String, RampState>,
    rebalance_config: RebalanceConfig,
    capital_config: CapitalRampConfig,
}

impl Scheduler {
    pub fn new(
        registry: PoolRegistry,
        ledger: std::sync::Arc<Ledger>,
        detector_config: DetectorConfig,
        rebalance_config: RebalanceConfig,
        capital_config: CapitalRampConfig,
    ) -> Self {
        Self {
            registry,
            ledger,
            detector: OpportunityDensityDetector::new(detector_config),
            defense: FeeBleedDefense::new(),
            ramp_states: HashMap::new(),
            rebalance_config,
            capital_config,
        }
    }

    /// Run one evaluation cycle against the current open-position set.
    /// `positions` is mutated in place: lifecycle transitions, rebalance
    /// bookkeeping and hold timestamps all land directly on the `Position`
    /// the caller owns.
    pub fn run_cycle(
        &mut self,
        positions: &mut HashMap<Uuid, Position>,
        signals: &HashMap<Uuid, PositionSignal>,
        pool_proofs: &HashMap<String, PoolProofSignal>,
        regime: Regime,
        flow: FlowState,
        portfolio_consistency_healthy: bool,
        now_ms: i64,
    ) -> AppResult<CycleOutcome> {
        let mut outcome = CycleOutcome::default();

        let recovery = self.defense.evaluate(now_ms);
        let multipliers = self.defense.multipliers();
        outcome.defense = Some(DefenseStatus {
            active: self.defense.is_active(),
            multipliers,
            deactivation_reason: recovery.map(|r| format!("{r:?}")),
        });

        self.evaluate_entries(
            pool_proofs,
            multipliers,
            regime,
            portfolio_consistency_healthy,
            now_ms,
            &mut outcome,
        );

        for (id, position) in positions.iter_mut() {
            self.evaluate_position(*id, position, signals.get(id), multipliers, flow, now_ms, &mut outcome);
        }

        self.detector.expire_spikes(now_ms);
        Ok(outcome)
    }

    fn evaluate_entries(
        &mut self,
        pool_proofs: &HashMap<String, PoolProofSignal>,
        multipliers: DefenseMultipliers,
        regime: Regime,
        portfolio_consistency_healthy: bool,
        now_ms: i64,
        outcome: &mut CycleOutcome,
    ) {
        let candidates = self.registry.candidate_addresses(now_ms);
        for address in candidates {
            let Some(proof_signal) = pool_proofs.get(&address) else {
                continue;
            };

            let assessment = match self.registry.with_entry(&address, |entry| {
                let snapshot = entry.latest_snapshot.as_ref();
                let ctx = ScoringContext {
                    fee_intensity: snapshot.map(|s| s.fee_intensity.to_string().parse().unwrap_or(0.0)).unwrap_or(0.0),
                    volume_in_range: snapshot.map(|s| s.volume_24h.to_string().parse().unwrap_or(0.0)).unwrap_or(0.0),
                    bin_stability: snapshot.map(|s| s.bin_stability()).unwrap_or(0.0),
                    churn_quality: snapshot.map(|s| s.churn_quality()).unwrap_or(0.0),
                    now_ms,
                    bootstrap: proof_signal.bootstrap,
                    has_micro_metrics: proof_signal.has_micro_metrics,
                };
                self.detector.assess(&entry.stats, &ctx)
            }) {
                Ok(assessment) => assessment,
                Err(_) => continue,
            };

            let Assessment::Scored { ods } = assessment else {
                continue;
            };

            let ev_positive = proof_signal.ev > 0.0;
            let conditions_hold = self.detector.spike_conditions_hold(
                ods,
                regime,
                ev_positive,
                self.defense.is_active(),
                portfolio_consistency_healthy,
            );
            self.detector.update_spike(&address, ods, conditions_hold, now_ms);
            let spiking = self.detector.active_spike(&address, now_ms).is_some();
            if !spiking && !self.detector.is_rare_convergence(ods) {
                continue;
            }

            let ramp_state = self
                .ramp_states
                .entry(address.clone())
                .or_insert_with(|| RampState::new(now_ms));

            let proof = ProofContext {
                fees_accrued: proof_signal.fees_accrued,
                entry_cost: proof_signal.entry_cost,
                expected_exit_cost: proof_signal.expected_exit_cost,
                normalized_fee_velocity_per_1000_per_hour: proof_signal
                    .normalized_fee_velocity_per_1000_per_hour,
                consecutive_velocity_intervals: proof_signal.consecutive_velocity_intervals,
            };
            let ramp_outcome = ramp_state.evaluate(&proof, now_ms, &self.capital_config);
            let stage = ramp_state.stage;

            match ramp_outcome {
                RampOutcome::Blacklisted => {
                    self.registry.set_blacklist(
                        &address,
                        now_ms + self.capital_config.blacklist_hours * 60 * 60 * 1000,
                    );
                    continue;
                }
                RampOutcome::WindowExpired => {
                    self.registry.set_cooldown(
                        &address,
                        now_ms + self.capital_config.window_expiry_cooldown_hours * 60 * 60 * 1000,
                    );
                    continue;
                }
                RampOutcome::Hold | RampOutcome::StepUp(_) => {}
            }

            let equity = self.ledger.equity().inner().to_string().parse::<f64>().unwrap_or(0.0);
            let raw_size = stage_size(stage, equity, &self.capital_config) * multipliers.position_size;
            let size = Money::new(rust_decimal::Decimal::try_from(raw_size).unwrap_or(rust_decimal::Decimal::ZERO));

            if self.ledger.can_reserve(size).is_err() {
                continue;
            }

            outcome.entries.push(EntryDecision {
                pool: PoolId::new(address),
                size,
                stage,
                reason: format!("ods={ods:.2} stage={stage:?}"),
            });
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn evaluate_position(
        &mut self,
        id: Uuid,
        position: &mut Position,
        signal: Option<&PositionSignal>,
        multipliers: DefenseMultipliers,
        flow: FlowState,
        now_ms: i64,
        outcome: &mut CycleOutcome,
    ) {
        let Some(signal) = signal else {
            tracing::warn!(position_id = %id, "no market signal this cycle, skipping");
            return;
        };
        let position_id = PositionId(id);

        match position.state() {
            LifecycleState::Active => {
                self.evaluate_hold_entry(position, signal, now_ms);
                self.evaluate_rebalance(position_id, position, signal, flow, now_ms, outcome);
                self.evaluate_bleed(position_id, position, signal, now_ms, outcome);
            }
            LifecycleState::Hold => {
                self.evaluate_hold_exit(position_id, position, signal, multipliers, now_ms, outcome);
                if position.state() == LifecycleState::Hold {
                    self.evaluate_rebalance(position_id, position, signal, flow, now_ms, outcome);
                    self.evaluate_bleed(position_id, position, signal, now_ms, outcome);
                }
            }
            LifecycleState::ExitTriggered => {
                self.evaluate_escape_hatch(position_id, position, signal, now_ms, outcome);
            }
            LifecycleState::ForcedExitPending | LifecycleState::Exiting => {}
        }
    }

    fn evaluate_hold_entry(&self, position: &mut Position, signal: &PositionSignal, now_ms: i64) {
        let ctx = HoldContext {
            price_movement_pct_per_hour: signal.price_movement_pct_per_hour,
            migration_slope: signal.migration_slope_per_min,
            normalized_fee_intensity: signal.normalized_fee_intensity,
            expected_net_value: signal.expected_net_value,
            entry_regime: position.entry_regime,
            current_regime: signal.current_regime,
            current_score: signal.current_score,
            hold_entry_ts_ms: position.hold_entry_ts_ms,
            now_ms,
        };
        if hold::evaluate(&ctx).can_enter_hold {
            let _ = position.enter_hold(now_ms);
        }
    }

    fn evaluate_hold_exit(
        &self,
        position_id: PositionId,
        position: &mut Position,
        signal: &PositionSignal,
        multipliers: DefenseMultipliers,
        now_ms: i64,
        outcome: &mut CycleOutcome,
    ) {
        let ctx = HoldContext {
            price_movement_pct_per_hour: signal.price_movement_pct_per_hour,
            migration_slope: signal.migration_slope_per_min,
            normalized_fee_intensity: signal.normalized_fee_intensity,
            expected_net_value: signal.expected_net_value,
            entry_regime: position.entry_regime,
            current_regime: signal.current_regime,
            current_score: signal.current_score,
            hold_entry_ts_ms: position.hold_entry_ts_ms,
            now_ms,
        };
        let evaluation = hold::evaluate(&ctx);
        let Some(hold_exit_reason) = evaluation.hold_exit_reason else {
            return;
        };
        let reason = ExitReasonCode::from(hold_exit_reason);

        // ev_gate widens under an active fee-bleed defense: the hold-exit EV
        // gate is itself part of the exit classifier's inputs, so fold the
        // multiplier into the ev figure handed to it.
        let gated_ev = signal.ev / multipliers.ev_gate;
        let classifier_ctx = ClassifierContext {
            ev: gated_ev,
            entry_regime: position.entry_regime,
            current_regime: signal.current_regime,
            migration_slope_per_min: signal.migration_slope_per_min,
            entry_score: position.entry_score,
            current_score: signal.current_score,
        };
        let classification = exit_classifier::classify(reason, &classifier_ctx);

        match classification.classification {
            Classification::Risk => {
                let _ = position
                    .lifecycle
                    .risk_exit_from_hold(classification.reason.label(), now_ms);
                outcome.exits.push(ExitDecision {
                    position: position_id,
                    reason: classification.reason.label().to_string(),
                    classification: Some(Classification::Risk),
                    risk_type: classification.risk_type,
                });
            }
            Classification::Noise => {
                let suppress = match hold_exit_reason {
                    HoldExitReason::MigrationSlopeExceeded | HoldExitReason::DurationCapExceeded => {
                        evaluation.suppress_low_movement_exit
                    }
                    _ => evaluation.suppress_score_decay_exit,
                };
                if suppress {
                    position.suppression_window.record(now_ms);
                } else {
                    let _ = position.lifecycle.trigger_exit(
                        TransitionCause::NoiseExitUnsuppressed(classification.reason.label().to_string()),
                        now_ms,
                    );
                    outcome.exits.push(ExitDecision {
                        position: position_id,
                        reason: classification.reason.label().to_string(),
                        classification: Some(Classification::Noise),
                        risk_type: None,
                    });
                }
            }
        }
    }

    fn evaluate_bleed(
        &mut self,
        position_id: PositionId,
        position: &mut Position,
        signal: &PositionSignal,
        now_ms: i64,
        outcome: &mut CycleOutcome,
    ) {
        if position.state() != LifecycleState::Active && position.state() != LifecycleState::Hold {
            return;
        }
        let ctx = bleed_guard::BleedContext {
            entry_ts_ms: position.entry_ts_ms,
            now_ms,
            regime: signal.current_regime,
            unrealized_pnl: signal.unrealized_pnl,
            loss_rate_per_hour: signal.loss_rate_per_hour,
            fee_rate_per_hour: signal.fee_rate_per_hour,
            fee_velocity: signal.current_fee_velocity,
            entry_fee_velocity: position.entry_fee_velocity,
            bad_window_count: position.bleed_bad_window_count,
        };
        let evaluation = bleed_guard::evaluate(&ctx);
        position.bleed_bad_window_count = evaluation.next_bad_window_count;

        if !evaluation.should_exit {
            return;
        }

        // Bleed guard's sustained-bleed determination is already conclusive;
        // it does not need the exit classifier's RISK/NOISE judgment.
        let cause = if position.state() == LifecycleState::Hold {
            position.lifecycle.risk_exit_from_hold("sustained-bleed", now_ms)
        } else {
            position
                .lifecycle
                .trigger_exit(TransitionCause::RiskExit("sustained-bleed".to_string()), now_ms)
        };
        if cause.is_ok() {
            self.registry.with_entry_mut(&position.pool_id.0, |entry| {
                entry.bleed.set_cooldown(now_ms + bleed_guard::POOL_COOLDOWN_MS);
            });
            outcome.exits.push(ExitDecision {
                position: position_id,
                reason: "sustained-bleed".to_string(),
                classification: Some(Classification::Risk),
                risk_type: None,
            });
        }
    }

    fn evaluate_rebalance(
        &mut self,
        position_id: PositionId,
        position: &mut Position,
        signal: &PositionSignal,
        flow: FlowState,
        now_ms: i64,
        outcome: &mut CycleOutcome,
    ) {
        let inputs = TriggerInputs {
            current_bin_fee_velocity: signal.current_fee_velocity,
            neighbor_max_fee_velocity: signal.neighbor_max_fee_velocity,
            rolling_peak_fee_velocity: signal.rolling_peak_fee_velocity,
            external_liquidity_in_range_change_pct: signal.external_liquidity_in_range_change_pct,
            adjacent_bin_revisit_rate_change_pct: signal.adjacent_bin_revisit_rate_change_pct,
            fees_accrued: position.accumulated_fees.inner().to_string().parse().unwrap_or(0.0),
            tx_cost: signal.tx_cost,
        };
        let estimated_fee_gain_5min = signal.current_fee_velocity / 12.0;

        let outcome_result = self.registry.with_entry_mut(&position.pool_id.0, |entry| {
            controller::evaluate(
                &inputs,
                estimated_fee_gain_5min,
                flow,
                &mut entry.rebalances,
                now_ms,
                &self.rebalance_config,
            )
        });

        if let RebalanceOutcome::Accept(decision) = outcome_result {
            position.record_rebalance(now_ms);
            outcome.rebalances.push(RebalanceDecision {
                position: position_id,
                trigger: decision.trigger,
                new_bin_config: format!("recenter@fee_velocity={:.4}", signal.current_fee_velocity),
                cost_estimate: signal.tx_cost,
                expected_gain: decision.estimated_fee_gain_5min,
            });
        }
    }

    fn evaluate_escape_hatch(
        &mut self,
        position_id: PositionId,
        position: &mut Position,
        signal: &PositionSignal,
        now_ms: i64,
        outcome: &mut CycleOutcome,
    ) {
        let exit_triggered_at_ms = position
            .lifecycle
            .events()
            .iter()
            .rev()
            .find(|e| e.new == LifecycleState::ExitTriggered)
            .map(|e| e.at_ms)
            .unwrap_or(now_ms);

        let ctx = escape_hatch::EscapeHatchContext {
            exit_triggered_at_ms,
            now_ms,
            suppression_count_last_30min: position.suppression_window.count(now_ms),
            bad_sample_counter: position.bad_sample_counter,
            bad_sample_max: BAD_SAMPLE_MAX,
            fee_velocity_per_hour: position.fee_snapshots.velocity_per_hour(),
            cost_target: signal.cost_target,
            fees_accrued: position.accumulated_fees.inner().to_string().parse().unwrap_or(0.0),
        };

        let Some(reason) = escape_hatch::evaluate(&ctx) else {
            return;
        };

        if position.lifecycle.escape_hatch(reason.as_str(), now_ms).is_ok() {
            outcome.exits.push(ExitDecision {
                position: position_id,
                reason: reason.as_str().to_string(),
                classification: None,
                risk_type: None,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mm_core::PoolId as CorePoolId;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn scheduler() -> Scheduler {
        Scheduler::new(
            PoolRegistry::new(),
            std::sync::Arc::new(Ledger::new(Money::ZERO, Money::new(dec!(10000)), Money::new(dec!(10000)))),
            DetectorConfig::default(),
            RebalanceConfig::default(),
            CapitalRampConfig::default(),
        )
    }

    fn healthy_signal() -> PositionSignal {
        PositionSignal {
            current_regime: Regime::Neutral,
            current_score: 50.0,
            ev: 1.0,
            unrealized_pnl: 5.0,
            loss_rate_per_hour: 0.0,
            fee_rate_per_hour: 2.0,
            current_fee_velocity: 2.0,
            migration_slope_per_min: 0.001,
            price_movement_pct_per_hour: 0.1,
            normalized_fee_intensity: 0.05,
            expected_net_value: 1.0,
            cost_target: 5.0,
            neighbor_max_fee_velocity: 2.0,
            rolling_peak_fee_velocity: 2.0,
            external_liquidity_in_range_change_pct: 0.0,
            adjacent_bin_revisit_rate_change_pct: 0.0,
            tx_cost: 5.0,
        }
    }

    fn spiking_pool_proof(ev: f64) -> PoolProofSignal {
        PoolProofSignal {
            fees_accrued: 0.0,
            entry_cost: 10.0,
            expected_exit_cost: 10.0,
            normalized_fee_velocity_per_1000_per_hour: 0.0,
            consecutive_velocity_intervals: 0,
            has_micro_metrics: true,
            bootstrap: false,
            ev,
        }
    }

    /// Seeds a pool with 30 near-identical baseline snapshots (steady-state
    /// sample floor) then one outlier so `fee_intensity`/`volume_in_range`
    /// clamp to `z_clamp`, while `migration_slope`/`bin_velocity`/
    /// `swap_velocity`/`price_velocity` stay constant so bin_stability and
    /// churn_quality contribute zero z-score. Weighted, this lands ODS
    /// around 2.6: above `spike_threshold` (2.2) but below
    /// `rare_convergence_threshold` (2.8), so it must go through spike
    /// confirmation rather than entering on rare convergence alone.
    fn seed_spiking_pool(registry: &PoolRegistry, address: &str) {
        let base = |fee: f64, volume: f64, ts: i64| mm_registry::PoolSnapshot {
            address: address.to_string(),
            liquidity: dec!(100000),
            volume_24h: rust_decimal::Decimal::try_from(volume).unwrap(),
            swap_velocity: dec!(0.01),
            bin_velocity: dec!(0.005),
            fee_intensity: rust_decimal::Decimal::try_from(fee).unwrap(),
            migration_slope: dec!(0.01),
            active_bin: 10,
            fee_rate: dec!(0.003),
            bin_step: 10,
            price_velocity: dec!(0.01),
            observed_at_ms: ts,
        };
        for i in 0..29 {
            let fee = if i % 2 == 0 { 0.05 } else { 0.051 };
            let volume = if i % 2 == 0 { 5000.0 } else { 5001.0 };
            registry.observe(base(fee, volume, i as i64 * 1_000));
        }
        registry.observe(base(5.0, 50_000.0, 29_000));
    }

    #[test]
    fn negative_ev_blocks_entry_despite_spike_level_ods() {
        let mut sched = scheduler();
        seed_spiking_pool(&sched.registry, "pool1");
        let mut proofs = HashMap::new();
        proofs.insert("pool1".to_string(), spiking_pool_proof(-1.0));
        let mut positions = HashMap::new();
        let signals = HashMap::new();

        for _ in 0..3 {
            let outcome = sched
                .run_cycle(&mut positions, &signals, &proofs, Regime::Neutral, FlowState::Normal, true, 30_000)
                .unwrap();
            assert!(outcome.entries.is_empty());
        }
    }

    #[test]
    fn positive_ev_confirms_spike_entry_after_consecutive_cycles() {
        let mut sched = scheduler();
        seed_spiking_pool(&sched.registry, "pool1");
        let mut proofs = HashMap::new();
        proofs.insert("pool1".to_string(), spiking_pool_proof(1.0));
        let mut positions = HashMap::new();
        let signals = HashMap::new();

        let first = sched
            .run_cycle(&mut positions, &signals, &proofs, Regime::Neutral, FlowState::Normal, true, 30_000)
            .unwrap();
        assert!(first.entries.is_empty(), "first cycle only starts the spike-confirm streak");

        let second = sched
            .run_cycle(&mut positions, &signals, &proofs, Regime::Neutral, FlowState::Normal, true, 31_000)
            .unwrap();
        assert_eq!(second.entries.len(), 1);
    }

    #[test]
    fn cycle_with_no_positions_and_no_candidates_is_a_no_op() {
        let mut sched = scheduler();
        let mut positions = HashMap::new();
        let signals = HashMap::new();
        let proofs = HashMap::new();
        let outcome = sched
            .run_cycle(&mut positions, &signals, &proofs, Regime::Neutral, FlowState::Normal, true, 0)
            .unwrap();
        assert!(outcome.entries.is_empty());
        assert!(outcome.exits.is_empty());
    }

    #[test]
    fn sustained_bleed_forces_a_risk_exit() {
        let mut sched = scheduler();
        let id = Uuid::new_v4();
        let position = Position::new(
            PositionId(id),
            CorePoolId::new("pool1"),
            0,
            Money::new(dec!(100)),
            2.0,
            Regime::Neutral,
            50.0,
        );

        let mut signal = healthy_signal();
        signal.unrealized_pnl = -4.0;
        signal.loss_rate_per_hour = 6.0;
        signal.fee_rate_per_hour = 2.0;
        signal.current_fee_velocity = 0.5;

        let mut positions = HashMap::new();
        positions.insert(id, position.clone());
        let mut signals = HashMap::new();
        signals.insert(id, signal);
        let proofs = HashMap::new();

        let now = bleed_guard::MIN_HOLD_NEUTRAL_MS + 1;
        for _ in 0..3 {
            sched
                .run_cycle(&mut positions, &signals, &proofs, Regime::Neutral, FlowState::Normal, true, now)
                .unwrap();
        }
        let position = positions.remove(&id).unwrap();
        // bleed guard's determination is conclusive: from HOLD it skips
        // straight to EXITING rather than landing in EXIT_TRIGGERED first.
        assert_eq!(position.state(), LifecycleState::Exiting);
    }
}
