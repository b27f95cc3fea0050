//! Sweep error types

use thiserror::Error;

/// Errors raised by resource adapters and the sweep engine
#[derive(Error, Debug)]
pub enum SweepError {
    #[error("Enumeration failed: {0}")]
    Enumeration(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SweepError>;
