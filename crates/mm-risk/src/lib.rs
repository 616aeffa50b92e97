//! Portfolio-level fee-bleed defense: a rolling-window throttle that
//! activates on systematic fee/slippage bleed and recovers once trading
//! proves healthy again.

pub mod error;
pub mod fee_bleed_defense;

pub use error::{RiskError, RiskResult};
pub use fee_bleed_defense::{
    DefenseMultipliers, FeeBleedDefense, RecoveryReason, TradeOutcome,
};
