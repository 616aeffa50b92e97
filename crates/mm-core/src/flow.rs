//! Flow state: a coarse per-pool classification of fee-velocity regime that
//! gates how aggressively the rebalance controller is allowed to act.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FlowState {
    High,
    Normal,
    Low,
    Bootstrap,
}

impl FlowState {
    /// Classify from a pool's current fee-velocity (USD/s). Bootstrap is not
    /// derivable from fee-velocity alone; callers override it from pool age.
    pub fn from_fee_velocity(fee_velocity_per_sec: f64) -> Self {
        if fee_velocity_per_sec >= 0.001 {
            FlowState::High
        } else if fee_velocity_per_sec >= 0.0001 {
            FlowState::Normal
        } else {
            FlowState::Low
        }
    }
}

impl std::fmt::Display for FlowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlowState::High => write!(f, "HIGH"),
            FlowState::Normal => write!(f, "NORMAL"),
            FlowState::Low => write!(f, "LOW"),
            FlowState::Bootstrap => write!(f, "BOOTSTRAP"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_fee_velocity() {
        assert_eq!(FlowState::from_fee_velocity(0.002), FlowState::High);
        assert_eq!(FlowState::from_fee_velocity(0.0005), FlowState::Normal);
        assert_eq!(FlowState::from_fee_velocity(0.00001), FlowState::Low);
    }
}
