//! Position error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PositionError {
    #[error("position not found: {0}")]
    NotFound(String),

    #[error("invalid lifecycle transition: {from} -> {to} via {cause}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
        cause: String,
    },
}

pub type PositionResult<T> = Result<T, PositionError>;
