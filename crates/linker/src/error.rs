//! Linker error types

use std::time::Duration;
use thiserror::Error;

/// Failure of a single remote lookup. Recovered per item by the pipeline.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{context} returned status {status}")]
    Status { status: u16, context: String },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

/// Setup-level failures that abort a run before any term is processed
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Service unreachable: {0}")]
    Unreachable(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Core error: {0}")]
    Core(#[from] geolink_core::CoreError),
}

pub type Result<T> = std::result::Result<T, LinkError>;
