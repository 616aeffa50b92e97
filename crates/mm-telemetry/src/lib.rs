//! Prometheus metrics and structured logging for the market-making
//! controller.
//!
//! Provides observability from Day 1:
//! - Prometheus metrics for lifecycle transitions, exit classifications,
//!   escape hatches, fee-bleed defense, rebalances, capital ramp, ODD, and
//!   the reconciliation seal
//! - Structured JSON logging with tracing
//! - Daily statistics output

pub mod daily_stats;
pub mod error;
pub mod logging;
pub mod metrics;

pub use daily_stats::{DailyStatsReporter, PoolDailyStats};
pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
