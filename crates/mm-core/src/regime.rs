//! The observational market regime signal.
//!
//! Regime is informational only: it MUST NOT block entries, force exits, or
//! scale size on its own. It participates only where the spec explicitly
//! says so (HOLD-exit adverse flip, Exit Classifier RISK flip, ODD spike
//! regime gate).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Regime {
    Bull,
    Neutral,
    Bear,
}

impl Regime {
    /// True for the adverse flips that the spec treats as a forced HOLD-exit
    /// / RISK classification: BULL→BEAR and NEUTRAL→BEAR.
    pub fn is_adverse_flip(entry: Regime, current: Regime) -> bool {
        matches!(
            (entry, current),
            (Regime::Bull, Regime::Bear) | (Regime::Neutral, Regime::Bear)
        )
    }

    pub fn is_favorable_for_spike(&self) -> bool {
        matches!(self, Regime::Neutral | Regime::Bull)
    }
}

impl std::fmt::Display for Regime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Regime::Bull => write!(f, "BULL"),
            Regime::Neutral => write!(f, "NEUTRAL"),
            Regime::Bear => write!(f, "BEAR"),
        }
    }
}
