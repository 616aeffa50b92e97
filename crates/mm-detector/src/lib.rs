//! Opportunity Density Detector: per-pool ODS scoring, spike confirmation
//! and peak-decaying TTL.

pub mod config;
pub mod detector;
pub mod error;

pub use config::DetectorConfig;
pub use detector::{Assessment, OpportunityDensityDetector, RejectReason, ScoringContext, Spike};
pub use error::{DetectorError, DetectorResult};
