//! Handler-level errors

use dash_core::{DashError, FailureReason};
use thiserror::Error;

use crate::backend::BackendError;

/// Why a command handler stopped
#[derive(Error, Debug)]
pub enum CommandError {
    /// Validation or handler decision with an explicit reason
    #[error("{message}")]
    Rejected {
        reason: FailureReason,
        message: String,
    },

    /// State, layout or store error
    #[error(transparent)]
    State(#[from] DashError),

    /// Unclassified collaborator failure
    #[error("collaborator call {operation} failed: {source}")]
    Backend {
        operation: String,
        #[source]
        source: BackendError,
    },

    #[error("command cancelled")]
    Cancelled,
}

impl CommandError {
    pub fn user(message: impl Into<String>) -> Self {
        Self::Rejected {
            reason: FailureReason::UserError,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::Rejected {
            reason: FailureReason::NotFound,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Rejected {
            reason: FailureReason::InternalError,
            message: message.into(),
        }
    }

    /// Failure reason reported in `commandFailed`
    pub fn reason(&self) -> FailureReason {
        match self {
            Self::Rejected { reason, .. } => *reason,
            Self::State(e) => e.reason(),
            Self::Backend { .. } | Self::Cancelled => FailureReason::InternalError,
        }
    }
}

pub type CommandResult<T> = std::result::Result<T, CommandError>;
