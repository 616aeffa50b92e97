//! Rebalance controller configuration: trigger thresholds, the cost gate
//! multiplier, and the per-flow-state frequency envelope.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebalanceConfig {
    #[serde(default = "default_dominance_flip_ratio")]
    pub dominance_flip_ratio: f64,
    #[serde(default = "default_velocity_collapse_fraction")]
    pub velocity_collapse_fraction: f64,
    #[serde(default = "default_liquidity_crowding_fraction")]
    pub liquidity_crowding_fraction: f64,
    #[serde(default = "default_revisit_spike_fraction")]
    pub revisit_spike_fraction: f64,
    #[serde(default = "default_profit_lock_multiplier")]
    pub profit_lock_multiplier: f64,
    #[serde(default = "default_cost_gate_multiplier")]
    pub cost_gate_multiplier: f64,

    #[serde(default = "default_high_min_interval_min")]
    pub high_min_interval_min: i64,
    #[serde(default = "default_high_max_per_day")]
    pub high_max_per_day: u64,
    #[serde(default = "default_normal_min_interval_min")]
    pub normal_min_interval_min: i64,
    #[serde(default = "default_normal_max_per_day")]
    pub normal_max_per_day: u64,
    #[serde(default = "default_bootstrap_min_interval_min")]
    pub bootstrap_min_interval_min: i64,
    #[serde(default = "default_bootstrap_max_per_day")]
    pub bootstrap_max_per_day: u64,
}

impl Default for RebalanceConfig {
    fn default() -> Self {
        Self {
            dominance_flip_ratio: default_dominance_flip_ratio(),
            velocity_collapse_fraction: default_velocity_collapse_fraction(),
            liquidity_crowding_fraction: default_liquidity_crowding_fraction(),
            revisit_spike_fraction: default_revisit_spike_fraction(),
            profit_lock_multiplier: default_profit_lock_multiplier(),
            cost_gate_multiplier: default_cost_gate_multiplier(),
            high_min_interval_min: default_high_min_interval_min(),
            high_max_per_day: default_high_max_per_day(),
            normal_min_interval_min: default_normal_min_interval_min(),
            normal_max_per_day: default_normal_max_per_day(),
            bootstrap_min_interval_min: default_bootstrap_min_interval_min(),
            bootstrap_max_per_day: default_bootstrap_max_per_day(),
        }
    }
}

fn default_dominance_flip_ratio() -> f64 {
    1.3
}
fn default_velocity_collapse_fraction() -> f64 {
    0.40
}
fn default_liquidity_crowding_fraction() -> f64 {
    0.20
}
fn default_revisit_spike_fraction() -> f64 {
    0.30
}
fn default_profit_lock_multiplier() -> f64 {
    1.25
}
fn default_cost_gate_multiplier() -> f64 {
    1.25
}
fn default_high_min_interval_min() -> i64 {
    2
}
fn default_high_max_per_day() -> u64 {
    480
}
fn default_normal_min_interval_min() -> i64 {
    5
}
fn default_normal_max_per_day() -> u64 {
    180
}
fn default_bootstrap_min_interval_min() -> i64 {
    10
}
fn default_bootstrap_max_per_day() -> u64 {
    50
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_from_partial_toml() {
        let config: RebalanceConfig = toml::from_str("dominance_flip_ratio = 1.5\n").unwrap();
        assert_eq!(config.dominance_flip_ratio, 1.5);
        assert_eq!(config.cost_gate_multiplier, default_cost_gate_multiplier());
    }
}
