//! Rebalance controller error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RebalanceError {
    #[error("configuration error: {0}")]
    ConfigError(String),
}

pub type RebalanceResult<T> = Result<T, RebalanceError>;
