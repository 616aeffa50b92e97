//! Opportunity Density Detector configuration.

use serde::{Deserialize, Serialize};

/// Tunable weights and thresholds for the Opportunity Density Detector.
///
/// Every field has a default matching the value named in the design, so a
/// deployment can override only the knobs it cares about from its TOML
/// config layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Weight on z(fee_intensity) in the ODS formula.
    #[serde(default = "default_weight_fee_intensity")]
    pub weight_fee_intensity: f64,
    /// Weight on z(volume_in_range).
    #[serde(default = "default_weight_volume_in_range")]
    pub weight_volume_in_range: f64,
    /// Weight on z(bin_stability).
    #[serde(default = "default_weight_bin_stability")]
    pub weight_bin_stability: f64,
    /// Weight on z(churn_quality).
    #[serde(default = "default_weight_churn_quality")]
    pub weight_churn_quality: f64,

    /// z-score winsorization clamp.
    #[serde(default = "default_z_clamp")]
    pub z_clamp: f64,

    /// Minimum samples required in steady state before scoring.
    #[serde(default = "default_min_samples_steady_state")]
    pub min_samples_steady_state: usize,
    /// Minimum samples required while the pool is still in bootstrap.
    #[serde(default = "default_min_samples_bootstrap")]
    pub min_samples_bootstrap: usize,
    /// Absolute floor below which no score is computed at all.
    #[serde(default = "default_min_samples_floor")]
    pub min_samples_floor: usize,

    /// Max staleness (ms) of the most recent sample before rejecting.
    #[serde(default = "default_max_staleness_ms")]
    pub max_staleness_ms: i64,
    /// Max fraction of identical timestamps before treating data as synthetic.
    #[serde(default = "default_max_identical_timestamp_fraction")]
    pub max_identical_timestamp_fraction: f64,

    /// ODS threshold to confirm a spike.
    #[serde(default = "default_spike_threshold")]
    pub spike_threshold: f64,
    /// Consecutive cycles the spike conditions must hold before confirming.
    #[serde(default = "default_spike_confirm_cycles")]
    pub spike_confirm_cycles: u32,
    /// TTL (ms) assigned to a freshly confirmed spike.
    #[serde(default = "default_spike_ttl_ms")]
    pub spike_ttl_ms: i64,
    /// Minimum TTL (ms) a decaying spike can be accelerated down to.
    #[serde(default = "default_spike_min_ttl_ms")]
    pub spike_min_ttl_ms: i64,
    /// Fractional drop from peak ODS that accelerates decay.
    #[serde(default = "default_peak_drop_fraction")]
    pub peak_drop_fraction: f64,

    /// ODS level considered a rare convergence worth flagging distinctly.
    #[serde(default = "default_rare_convergence_threshold")]
    pub rare_convergence_threshold: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            weight_fee_intensity: default_weight_fee_intensity(),
            weight_volume_in_range: default_weight_volume_in_range(),
            weight_bin_stability: default_weight_bin_stability(),
            weight_churn_quality: default_weight_churn_quality(),
            z_clamp: default_z_clamp(),
            min_samples_steady_state: default_min_samples_steady_state(),
            min_samples_bootstrap: default_min_samples_bootstrap(),
            min_samples_floor: default_min_samples_floor(),
            max_staleness_ms: default_max_staleness_ms(),
            max_identical_timestamp_fraction: default_max_identical_timestamp_fraction(),
            spike_threshold: default_spike_threshold(),
            spike_confirm_cycles: default_spike_confirm_cycles(),
            spike_ttl_ms: default_spike_ttl_ms(),
            spike_min_ttl_ms: default_spike_min_ttl_ms(),
            peak_drop_fraction: default_peak_drop_fraction(),
            rare_convergence_threshold: default_rare_convergence_threshold(),
        }
    }
}

fn default_weight_fee_intensity() -> f64 {
    0.35
}
fn default_weight_volume_in_range() -> f64 {
    0.30
}
fn default_weight_bin_stability() -> f64 {
    0.20
}
fn default_weight_churn_quality() -> f64 {
    0.15
}
fn default_z_clamp() -> f64 {
    4.0
}
fn default_min_samples_steady_state() -> usize {
    30
}
fn default_min_samples_bootstrap() -> usize {
    5
}
fn default_min_samples_floor() -> usize {
    15
}
fn default_max_staleness_ms() -> i64 {
    5 * 60 * 1000
}
fn default_max_identical_timestamp_fraction() -> f64 {
    0.30
}
fn default_spike_threshold() -> f64 {
    2.2
}
fn default_spike_confirm_cycles() -> u32 {
    2
}
fn default_spike_ttl_ms() -> i64 {
    15 * 60 * 1000
}
fn default_spike_min_ttl_ms() -> i64 {
    5 * 60 * 1000
}
fn default_peak_drop_fraction() -> f64 {
    0.30
}
fn default_rare_convergence_threshold() -> f64 {
    2.8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_weights_sum_to_one() {
        let config = DetectorConfig::default();
        let sum = config.weight_fee_intensity
            + config.weight_volume_in_range
            + config.weight_bin_stability
            + config.weight_churn_quality;
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn deserializes_from_partial_toml() {
        let toml_str = "spike_threshold = 2.5\n";
        let config: DetectorConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.spike_threshold, 2.5);
        assert_eq!(config.weight_fee_intensity, default_weight_fee_intensity());
    }
}
