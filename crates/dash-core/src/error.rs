//! Unified error types for the dashboard engine

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure classification carried by `commandFailed` events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureReason {
    /// Bad input: malformed index, invalid value, wrong widget type
    UserError,
    /// Referenced entity is absent
    NotFound,
    /// Invariant violated, collaborator failure or caught panic
    InternalError,
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UserError => write!(f, "USER_ERROR"),
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::InternalError => write!(f, "INTERNAL_ERROR"),
        }
    }
}

/// Unified error type for state, layout and configuration operations
#[derive(Error, Debug)]
pub enum DashError {
    // Input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Invalid size: {0}")]
    InvalidSize(String),

    #[error("Read-only dashboard: {0}")]
    ReadOnly(String),

    // Lookup errors
    #[error("Not found: {0}")]
    NotFound(String),

    // Structural errors
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

impl DashError {
    /// Classify this error for the event contract
    pub fn reason(&self) -> FailureReason {
        match self {
            Self::InvalidInput(_)
            | Self::InvalidPath(_)
            | Self::InvalidSize(_)
            | Self::ReadOnly(_) => FailureReason::UserError,
            Self::NotFound(_) => FailureReason::NotFound,
            Self::InvariantViolation(_)
            | Self::Config(_)
            | Self::Io(_)
            | Self::Serialization(_)
            | Self::Other(_) => FailureReason::InternalError,
        }
    }
}

/// Result type alias using DashError
pub type Result<T> = std::result::Result<T, DashError>;
