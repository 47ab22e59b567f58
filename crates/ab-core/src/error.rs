//! # AppError
//!
//! Centralized error handling for the abroad workspace.
//! Every port and access module reports failures through this type.

use thiserror::Error;

/// The primary error type for all ab-core operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// A mutating call was attempted with no signed-in actor.
    #[error("not authenticated")]
    Unauthenticated,

    /// Client-side validation rejected the input (e.g., empty post content).
    /// No backend round-trip happens before this is returned.
    #[error("validation failed: {0}")]
    ValidationFailed(String),

    /// Transport or storage failure talking to the hosted backend.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Resource not found (e.g., Profile, Post)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// The backend rejected a row because of a uniqueness constraint
    #[error("conflict: {0}")]
    Conflict(String),

    /// Malformed payloads and other programming errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::ValidationFailed(msg.into())
    }

    pub fn unavailable(msg: impl std::fmt::Display) -> Self {
        AppError::BackendUnavailable(msg.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("malformed row: {err}"))
    }
}

/// A specialized Result type for abroad logic.
pub type Result<T> = std::result::Result<T, AppError>;
