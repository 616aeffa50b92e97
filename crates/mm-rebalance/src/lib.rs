//! Event-driven rebalance controller: no trigger fires on a timer. Five
//! triggers compete each cycle, a cost gate filters all but two emergency
//! triggers, and a per-flow-state frequency envelope is the backpressure
//! mechanism of last resort.

pub mod config;
pub mod controller;
pub mod error;
pub mod trigger;

pub use config::RebalanceConfig;
pub use controller::{evaluate, RebalanceDecision, RebalanceOutcome, RejectReason};
pub use error::{RebalanceError, RebalanceResult};
pub use trigger::{evaluate_triggers, Trigger, TriggerInputs};
