//! Action error handling
//!
//! Classifies failures into response codes and logs them at a level that
//! matches who caused them.

use crate::DocqaError;
use crate::mcp::protocol::{ActionResponse, ErrorCode, RequestId};
use thiserror::Error;
use tracing::{error, warn};

/// Errors surfaced to protocol clients
#[derive(Error, Debug)]
pub enum ActionError {
    #[error("Unknown action: {action}")]
    UnknownAction { action: String },

    #[error("Missing action")]
    MissingAction,

    #[error("Invalid parameters for {action}: {message}")]
    InvalidParameters { action: String, message: String },

    #[error("Parse error: {message}")]
    ParseError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Upstream error: {message}")]
    UpstreamError { message: String },

    #[error("Internal error: {message}")]
    InternalError { message: String },
}

impl ActionError {
    #[inline]
    pub fn invalid_parameters(action: &str, message: impl Into<String>) -> Self {
        Self::InvalidParameters {
            action: action.to_string(),
            message: message.into(),
        }
    }

    #[inline]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UnknownAction { .. }
            | Self::MissingAction
            | Self::InvalidParameters { .. }
            | Self::ParseError { .. }
            | Self::ValidationError { .. } => ErrorCode::Validation,
            Self::UpstreamError { .. } => ErrorCode::Upstream,
            Self::InternalError { .. } => ErrorCode::Internal,
        }
    }

    #[inline]
    pub fn to_response(&self, id: RequestId) -> ActionResponse {
        ActionResponse::error(id, self.to_string(), self.code())
    }

    /// Log the error with appropriate level
    #[inline]
    pub fn log(&self) {
        match self.code() {
            ErrorCode::Validation => warn!("Client error: {}", self),
            ErrorCode::Upstream => error!("Upstream error: {}", self),
            ErrorCode::Internal => error!("Server error: {}", self),
        }
    }
}

/// Result type for action handlers
pub type ActionResult<T> = Result<T, ActionError>;

impl From<DocqaError> for ActionError {
    #[inline]
    fn from(error: DocqaError) -> Self {
        match error {
            DocqaError::Validation(message) => Self::ValidationError { message },
            DocqaError::Upstream(message) => Self::UpstreamError { message },
            other => Self::InternalError {
                message: other.to_string(),
            },
        }
    }
}

impl From<anyhow::Error> for ActionError {
    #[inline]
    fn from(error: anyhow::Error) -> Self {
        Self::InternalError {
            message: format!("{:#}", error),
        }
    }
}

impl From<serde_json::Error> for ActionError {
    #[inline]
    fn from(error: serde_json::Error) -> Self {
        Self::ParseError {
            message: error.to_string(),
        }
    }
}
