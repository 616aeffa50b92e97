//! Capital ramp error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CapitalError {
    #[error("configuration error: {0}")]
    ConfigError(String),
}

pub type CapitalResult<T> = Result<T, CapitalError>;
