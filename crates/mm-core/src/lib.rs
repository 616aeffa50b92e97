//! Core domain types for the market-making controller.
//!
//! This crate provides the fundamental types shared by every other crate in
//! the workspace:
//! - [`Money`]: precision-safe currency amounts (`rust_decimal`-backed)
//! - [`PositionId`], [`PoolId`], [`RunId`]: identifiers
//! - [`Clock`]: injected time source (absolute timestamps, not durations)
//! - [`RollingStat`]: bounded-window Welford mean/variance used by the
//!   Opportunity Density Detector and the Bleed Guard
//! - [`Regime`]: the observational BULL/NEUTRAL/BEAR signal
//! - [`FlowState`]: the HIGH/NORMAL/LOW/BOOTSTRAP fee-velocity classification

pub mod clock;
pub mod decimal;
pub mod error;
pub mod flow;
pub mod ids;
pub mod regime;
pub mod rolling;

pub use clock::{Clock, ManualClock, SystemClock};
pub use decimal::Money;
pub use error::{CoreError, Result};
pub use flow::FlowState;
pub use ids::{PoolId, PositionId, RunId};
pub use regime::Regime;
pub use rolling::RollingStat;
