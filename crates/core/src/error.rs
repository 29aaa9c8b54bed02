//! Error types for the core domain

use thiserror::Error;

/// Core domain errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid entity id: {0:?}")]
    InvalidEntityId(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
