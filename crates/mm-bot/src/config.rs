//! Aggregate application configuration.
//!
//! One `AppConfig` pulling in a config struct per component, each with
//! `#[serde(default = "fn")]` fields so a deployment can override only the
//! knobs it cares about from its TOML layer. `RECONCILE_ONLY`, `DEV_MODE`
//! and `SCAN_INTERVAL_MS` are read from the environment at startup, not
//! from this file — see `EnvSettings`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use mm_capital::CapitalRampConfig;
use mm_detector::DetectorConfig;
use mm_rebalance::RebalanceConfig;

use crate::error::{AppError, AppResult};

/// File-backed persistence paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default = "default_runtime_state_path")]
    pub runtime_state_path: PathBuf,
    #[serde(default = "default_positions_path")]
    pub positions_path: PathBuf,
    #[serde(default = "default_snapshot_store_path")]
    pub snapshot_store_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            runtime_state_path: default_runtime_state_path(),
            positions_path: default_positions_path(),
            snapshot_store_path: default_snapshot_store_path(),
        }
    }
}

fn default_runtime_state_path() -> PathBuf {
    PathBuf::from("data/runtime_state.json")
}
fn default_positions_path() -> PathBuf {
    PathBuf::from("data/positions.jsonl")
}
fn default_snapshot_store_path() -> PathBuf {
    PathBuf::from("data/snapshots.jsonl")
}

/// A flat, operating-cost estimate substituting for a full execution cost
/// model: dollars assumed spent on gas/slippage for one rebalance or one
/// entry. No on-chain cost simulator ships in this workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostConfig {
    #[serde(default = "default_rebalance_tx_cost")]
    pub rebalance_tx_cost: f64,
    #[serde(default = "default_entry_cost")]
    pub entry_cost: f64,
    #[serde(default = "default_expected_exit_cost")]
    pub expected_exit_cost: f64,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            rebalance_tx_cost: default_rebalance_tx_cost(),
            entry_cost: default_entry_cost(),
            expected_exit_cost: default_expected_exit_cost(),
        }
    }
}

fn default_rebalance_tx_cost() -> f64 {
    5.0
}
fn default_entry_cost() -> f64 {
    3.0
}
fn default_expected_exit_cost() -> f64 {
    3.0
}

/// Initial capital figures used when no prior ledger state is being
/// reconciled (a cold start with nothing persisted yet).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapitalConfig {
    #[serde(default = "default_starting_equity")]
    pub starting_equity: f64,
}

impl Default for CapitalConfig {
    fn default() -> Self {
        Self {
            starting_equity: default_starting_equity(),
        }
    }
}

fn default_starting_equity() -> f64 {
    10_000.0
}

/// Aggregate configuration for the market-making controller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub rebalance: RebalanceConfig,
    #[serde(default)]
    pub capital_ramp: CapitalRampConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub cost: CostConfig,
    #[serde(default)]
    pub capital: CapitalConfig,
}

impl AppConfig {
    /// Load from `MM_CONFIG` env var or `config/default.toml`, falling back
    /// to defaults with a warning if the file is absent.
    pub fn load() -> AppResult<Self> {
        let path = std::env::var("MM_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());
        if std::path::Path::new(&path).exists() {
            Self::from_file(&path)
        } else {
            tracing::warn!(path = %path, "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    pub fn from_file(path: &str) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(AppError::Io)?;
        toml::from_str(&contents).map_err(|e| AppError::Config(e.to_string()))
    }
}

/// The three environment-variable knobs read at startup rather than from
/// the TOML config layer.
#[derive(Debug, Clone, Copy)]
pub struct EnvSettings {
    pub reconcile_only: bool,
    pub dev_mode: bool,
    pub scan_interval_ms: i64,
}

impl EnvSettings {
    pub fn from_env() -> Self {
        Self {
            reconcile_only: env_flag("RECONCILE_ONLY"),
            dev_mode: env_flag("DEV_MODE"),
            scan_interval_ms: std::env::var("SCAN_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default_scan_interval_ms()),
        }
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

pub fn default_scan_interval_ms() -> i64 {
    2 * 60 * 1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = AppConfig::default();
        let serialized = toml::to_string(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(
            parsed.capital_ramp.probe_cap,
            config.capital_ramp.probe_cap
        );
    }

    #[test]
    fn deserializes_partial_toml_with_component_defaults() {
        let toml_str = "[capital_ramp]\nprobe_cap = 200.0\n";
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.capital_ramp.probe_cap, 200.0);
        assert_eq!(config.rebalance.cost_gate_multiplier, 1.25);
    }
}
