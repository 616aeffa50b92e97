//! Error types for mm-registry.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("unknown pool: {0}")]
    UnknownPool(String),
}

pub type Result<T> = std::result::Result<T, RegistryError>;
