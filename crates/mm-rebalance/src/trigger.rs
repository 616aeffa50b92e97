//! The five rebalance triggers. No trigger fires on a timer; all five read
//! off the current cycle's pool/position snapshot.

use crate::config::RebalanceConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    DominanceFlip,
    VelocityCollapse,
    LiquidityCrowding,
    RevisitSpike,
    ProfitLock,
}

impl Trigger {
    /// DOMINANCE_FLIP and VELOCITY_COLLAPSE are emergencies: they bypass the
    /// cost gate entirely.
    pub fn bypasses_cost_gate(&self) -> bool {
        matches!(self, Trigger::DominanceFlip | Trigger::VelocityCollapse)
    }
}

/// Per-cycle inputs a trigger evaluation needs, taken from the pool/position
/// snapshot for the bin a position currently occupies.
#[derive(Debug, Clone, Copy)]
pub struct TriggerInputs {
    pub current_bin_fee_velocity: f64,
    pub neighbor_max_fee_velocity: f64,
    pub rolling_peak_fee_velocity: f64,
    pub external_liquidity_in_range_change_pct: f64,
    pub adjacent_bin_revisit_rate_change_pct: f64,
    pub fees_accrued: f64,
    pub tx_cost: f64,
}

/// Evaluate all five triggers against this cycle's inputs, in spec order.
/// More than one may fire simultaneously; the caller picks the strongest.
pub fn evaluate_triggers(inputs: &TriggerInputs, config: &RebalanceConfig) -> Vec<Trigger> {
    let mut fired = Vec::new();

    if inputs.current_bin_fee_velocity > 0.0
        && inputs.neighbor_max_fee_velocity
            >= inputs.current_bin_fee_velocity * config.dominance_flip_ratio
    {
        fired.push(Trigger::DominanceFlip);
    }

    if inputs.rolling_peak_fee_velocity > 0.0 {
        let drop_fraction = (inputs.rolling_peak_fee_velocity - inputs.current_bin_fee_velocity)
            / inputs.rolling_peak_fee_velocity;
        if drop_fraction >= config.velocity_collapse_fraction {
            fired.push(Trigger::VelocityCollapse);
        }
    }

    if inputs.external_liquidity_in_range_change_pct >= config.liquidity_crowding_fraction {
        fired.push(Trigger::LiquidityCrowding);
    }

    if inputs.adjacent_bin_revisit_rate_change_pct >= config.revisit_spike_fraction {
        fired.push(Trigger::RevisitSpike);
    }

    if inputs.fees_accrued >= inputs.tx_cost * config.profit_lock_multiplier {
        fired.push(Trigger::ProfitLock);
    }

    fired
}
