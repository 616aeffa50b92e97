//! Application error types.
//!
//! `AppError` wraps every component crate's own error type plus the
//! process-level failure modes in the error taxonomy: config problems are
//! fatal at startup, invariant violations are fatal mid-run, everything else
//! is either logged-and-skipped or surfaced to the caller.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Registry error: {0}")]
    Registry(#[from] mm_registry::RegistryError),

    #[error("Risk error: {0}")]
    Risk(#[from] mm_risk::RiskError),

    #[error("Detector error: {0}")]
    Detector(#[from] mm_detector::DetectorError),

    #[error("Position error: {0}")]
    Position(#[from] mm_position::PositionError),

    #[error("Capital error: {0}")]
    Capital(#[from] mm_capital::CapitalError),

    #[error("Rebalance error: {0}")]
    Rebalance(#[from] mm_rebalance::RebalanceError),

    #[error("Seal error: {0}")]
    Seal(#[from] mm_seal::SealError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] mm_telemetry::TelemetryError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] mm_persistence::PersistenceError),

    #[error("Reconciliation failed: {0}")]
    Reconciliation(String),

    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Shutdown requested")]
    Shutdown,
}

impl AppError {
    /// Invariant violations and missing config are process-fatal per the
    /// error taxonomy; everything else is recoverable at the call site.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::Config(_) | AppError::InvariantViolation(_) | AppError::Seal(_)
        )
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_and_invariant_errors_are_fatal() {
        assert!(AppError::Config("missing".into()).is_fatal());
        assert!(AppError::InvariantViolation("seal mismatch".into()).is_fatal());
    }

    #[test]
    fn reconciliation_error_is_not_fatal() {
        assert!(!AppError::Reconciliation("retry".into()).is_fatal());
    }
}
