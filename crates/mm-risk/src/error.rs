//! Risk error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RiskError {
    #[error("configuration error: {0}")]
    ConfigError(String),
}

pub type RiskResult<T> = Result<T, RiskError>;
