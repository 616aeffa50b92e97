//! Capital ramp configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapitalRampConfig {
    #[serde(default = "default_probe_pct")]
    pub probe_pct: f64,
    #[serde(default = "default_probe_cap")]
    pub probe_cap: f64,
    #[serde(default = "default_probe_floor")]
    pub probe_floor: f64,
    #[serde(default = "default_tranche2_pct")]
    pub tranche2_pct: f64,
    #[serde(default = "default_tranche3_pct")]
    pub tranche3_pct: f64,
    #[serde(default = "default_cap_pct")]
    pub cap_pct: f64,
    #[serde(default = "default_per_pool_hard_cap_pct")]
    pub per_pool_hard_cap_pct: f64,

    #[serde(default = "default_proof_window_min_min")]
    pub proof_window_min_min: i64,
    #[serde(default = "default_proof_window_max_min")]
    pub proof_window_max_min: i64,
    #[serde(default = "default_proof_fee_fraction")]
    pub proof_fee_fraction: f64,
    #[serde(default = "default_proof_velocity_per_1000")]
    pub proof_velocity_per_1000_per_hour: f64,
    #[serde(default = "default_proof_velocity_consecutive_intervals")]
    pub proof_velocity_consecutive_intervals: u32,

    #[serde(default = "default_step_up_dwell_min")]
    pub step_up_dwell_min: i64,
    #[serde(default = "default_window_expiry_cooldown_hours")]
    pub window_expiry_cooldown_hours: i64,
    #[serde(default = "default_consecutive_failures_for_blacklist")]
    pub consecutive_failures_for_blacklist: u32,
    #[serde(default = "default_blacklist_hours")]
    pub blacklist_hours: i64,

    #[serde(default = "default_max_concurrent_pools_initial")]
    pub max_concurrent_pools_initial: u32,
    #[serde(default = "default_max_concurrent_pools_graduated")]
    pub max_concurrent_pools_graduated: u32,
    #[serde(default = "default_top_performer_cap_pct")]
    pub top_performer_cap_pct: f64,
}

impl Default for CapitalRampConfig {
    fn default() -> Self {
        Self {
            probe_pct: default_probe_pct(),
            probe_cap: default_probe_cap(),
            probe_floor: default_probe_floor(),
            tranche2_pct: default_tranche2_pct(),
            tranche3_pct: default_tranche3_pct(),
            cap_pct: default_cap_pct(),
            per_pool_hard_cap_pct: default_per_pool_hard_cap_pct(),
            proof_window_min_min: default_proof_window_min_min(),
            proof_window_max_min: default_proof_window_max_min(),
            proof_fee_fraction: default_proof_fee_fraction(),
            proof_velocity_per_1000_per_hour: default_proof_velocity_per_1000(),
            proof_velocity_consecutive_intervals: default_proof_velocity_consecutive_intervals(),
            step_up_dwell_min: default_step_up_dwell_min(),
            window_expiry_cooldown_hours: default_window_expiry_cooldown_hours(),
            consecutive_failures_for_blacklist: default_consecutive_failures_for_blacklist(),
            blacklist_hours: default_blacklist_hours(),
            max_concurrent_pools_initial: default_max_concurrent_pools_initial(),
            max_concurrent_pools_graduated: default_max_concurrent_pools_graduated(),
            top_performer_cap_pct: default_top_performer_cap_pct(),
        }
    }
}

fn default_probe_pct() -> f64 {
    0.010
}
fn default_probe_cap() -> f64 {
    150.0
}
fn default_probe_floor() -> f64 {
    25.0
}
fn default_tranche2_pct() -> f64 {
    0.025
}
fn default_tranche3_pct() -> f64 {
    0.050
}
fn default_cap_pct() -> f64 {
    0.30
}
fn default_per_pool_hard_cap_pct() -> f64 {
    0.18
}
fn default_proof_window_min_min() -> i64 {
    45
}
fn default_proof_window_max_min() -> i64 {
    90
}
fn default_proof_fee_fraction() -> f64 {
    0.35
}
/// Dollars of fee velocity per $1000 deployed, per hour. Tunable: carried
/// as a named constant rather than derived from equity at runtime.
fn default_proof_velocity_per_1000() -> f64 {
    0.10
}
fn default_proof_velocity_consecutive_intervals() -> u32 {
    3
}
fn default_step_up_dwell_min() -> i64 {
    30
}
fn default_window_expiry_cooldown_hours() -> i64 {
    6
}
fn default_consecutive_failures_for_blacklist() -> u32 {
    3
}
fn default_blacklist_hours() -> i64 {
    24
}
fn default_max_concurrent_pools_initial() -> u32 {
    5
}
fn default_max_concurrent_pools_graduated() -> u32 {
    3
}
fn default_top_performer_cap_pct() -> f64 {
    0.30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_from_partial_toml() {
        let config: CapitalRampConfig = toml::from_str("probe_cap = 200.0\n").unwrap();
        assert_eq!(config.probe_cap, 200.0);
        assert_eq!(config.probe_pct, default_probe_pct());
    }
}
