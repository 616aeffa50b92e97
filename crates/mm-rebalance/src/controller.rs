//! The rebalance controller: combines trigger evaluation, the cost gate, and
//! the per-flow-state frequency envelope into one accept/reject decision.

use mm_core::FlowState;
use mm_registry::RebalanceHistory;
use tracing::{debug, trace};

use crate::config::RebalanceConfig;
use crate::trigger::{evaluate_triggers, Trigger, TriggerInputs};

/// Why a rebalance cycle was rejected, recorded for telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    NoTrigger,
    CostGate,
    FrequencyInterval,
    FrequencyDailyCap,
    FlowDisabled,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RebalanceDecision {
    pub trigger: Trigger,
    pub estimated_fee_gain_5min: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RebalanceOutcome {
    Accept(RebalanceDecision),
    Reject(RejectReason),
}

fn frequency_envelope(flow: FlowState, config: &RebalanceConfig) -> Option<(i64, u64)> {
    match flow {
        FlowState::High => Some((config.high_min_interval_min, config.high_max_per_day)),
        FlowState::Normal => Some((config.normal_min_interval_min, config.normal_max_per_day)),
        FlowState::Low => None,
        FlowState::Bootstrap => Some((
            config.bootstrap_min_interval_min,
            config.bootstrap_max_per_day,
        )),
    }
}

/// Evaluate one position's rebalance cycle. `history` is mutated with the
/// new timestamp on acceptance; callers that want a dry-run preview should
/// clone the history first.
pub fn evaluate(
    inputs: &TriggerInputs,
    estimated_fee_gain_5min: f64,
    flow: FlowState,
    history: &mut RebalanceHistory,
    now_ms: i64,
    config: &RebalanceConfig,
) -> RebalanceOutcome {
    let Some((min_interval_min, max_per_day)) = frequency_envelope(flow, config) else {
        trace!(?flow, "rebalance disabled for flow state");
        return RebalanceOutcome::Reject(RejectReason::FlowDisabled);
    };

    let fired = evaluate_triggers(inputs, config);
    let Some(&trigger) = fired.first() else {
        return RebalanceOutcome::Reject(RejectReason::NoTrigger);
    };

    if !trigger.bypasses_cost_gate()
        && estimated_fee_gain_5min < inputs.tx_cost * config.cost_gate_multiplier
    {
        debug!(?trigger, estimated_fee_gain_5min, "cost gate blocked rebalance");
        return RebalanceOutcome::Reject(RejectReason::CostGate);
    }

    if let Some(minutes_since) = history.minutes_since_last(now_ms) {
        if minutes_since < min_interval_min {
            return RebalanceOutcome::Reject(RejectReason::FrequencyInterval);
        }
    }

    if history.count_last_24h(now_ms) as u64 >= max_per_day {
        return RebalanceOutcome::Reject(RejectReason::FrequencyDailyCap);
    }

    history.record_rebalance(now_ms);
    RebalanceOutcome::Accept(RebalanceDecision {
        trigger,
        estimated_fee_gain_5min,
    })
}
