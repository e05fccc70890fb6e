//! Error types for feedesk-core
//!
//! Gateway failures never reach this layer as errors; what remains are
//! validation problems, rejected writes and export failures.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidAmount,
    MissingField,
    NotFound,
    ConfirmationRequired,
    Rejected,
    PartiallyApplied,
    InvalidPhone,
    ExportFailed,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::InvalidAmount => write!(f, "INVALID_AMOUNT"),
            ErrorCode::MissingField => write!(f, "MISSING_FIELD"),
            ErrorCode::NotFound => write!(f, "NOT_FOUND"),
            ErrorCode::ConfirmationRequired => write!(f, "CONFIRMATION_REQUIRED"),
            ErrorCode::Rejected => write!(f, "REJECTED"),
            ErrorCode::PartiallyApplied => write!(f, "PARTIALLY_APPLIED"),
            ErrorCode::InvalidPhone => write!(f, "INVALID_PHONE"),
            ErrorCode::ExportFailed => write!(f, "EXPORT_FAILED"),
        }
    }
}

/// Failures of the mutation workflows
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkflowError {
    #[error("Enter valid amount (got '{input}')")]
    InvalidAmount { input: String },

    #[error("{field} is required")]
    MissingField { field: String },

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Deletion must be confirmed")]
    ConfirmationRequired,

    #[error("Error: {message}")]
    Rejected { message: String },

    /// First write of a two-step workflow went through, the second did not
    #[error("{completed}, but the follow-up update failed: {failed}")]
    PartiallyApplied { completed: String, failed: String },
}

impl WorkflowError {
    pub fn code(&self) -> ErrorCode {
        match self {
            WorkflowError::InvalidAmount { .. } => ErrorCode::InvalidAmount,
            WorkflowError::MissingField { .. } => ErrorCode::MissingField,
            WorkflowError::NotFound { .. } => ErrorCode::NotFound,
            WorkflowError::ConfirmationRequired => ErrorCode::ConfirmationRequired,
            WorkflowError::Rejected { .. } => ErrorCode::Rejected,
            WorkflowError::PartiallyApplied { .. } => ErrorCode::PartiallyApplied,
        }
    }
}

/// Reminder link problems
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MessagingError {
    #[error("Invalid Phone Number: '{raw}'\nPlease update it in the Edit menu.")]
    InvalidPhone { raw: String },
}

impl MessagingError {
    pub fn code(&self) -> ErrorCode {
        match self {
            MessagingError::InvalidPhone { .. } => ErrorCode::InvalidPhone,
        }
    }
}

/// Other core failures
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV export produced invalid text: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    #[error("CSV export failed: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    pub fn code(&self) -> ErrorCode {
        ErrorCode::ExportFailed
    }
}
