//! Error types for mm-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid money amount: {0}")]
    InvalidMoney(String),

    #[error("invalid pool id: {0}")]
    InvalidPoolId(String),

    #[error("decimal parse error: {0}")]
    DecimalParse(#[from] rust_decimal::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
