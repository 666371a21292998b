//! Result and error types for the core library

use serde::Serialize;
use thiserror::Error;

/// Core library error type
///
/// Every variant belongs to exactly one [`ErrorKind`], which is what callers
/// should branch on when deciding whether to retry or how to report a failure.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Insufficient funds in account {account_id}: balance would be {balance}")]
    InsufficientFunds { account_id: i64, balance: i64 },

    #[error("Currency mismatch: {0}")]
    CurrencyMismatch(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Transient store error: {0}")]
    Transient(String),

    #[error("Deadline exceeded: {0}")]
    DeadlineExceeded(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A referenced row does not exist. Terminal.
    NotFound,
    /// The request was rejected before or during execution. Terminal.
    InvalidArgument,
    /// The backing store refused the write. Terminal.
    ConstraintViolation,
    /// Conflict, lock or connection trouble. The whole operation may be retried.
    TransientStoreError,
    /// Anything else.
    Internal,
}

/// Protocol-level outcome a request layer reports for an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    ResourceMissing,
    RequestRejected,
    InternalFailure,
}

impl Error {
    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a constraint violation error
    pub fn constraint(msg: impl Into<String>) -> Self {
        Self::ConstraintViolation(msg.into())
    }

    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::InvalidArgument(_)
            | Error::InsufficientFunds { .. }
            | Error::CurrencyMismatch(_)
            | Error::PermissionDenied(_) => ErrorKind::InvalidArgument,
            Error::ConstraintViolation(_) => ErrorKind::ConstraintViolation,
            Error::Transient(_) | Error::DeadlineExceeded(_) => ErrorKind::TransientStoreError,
            Error::Database(_) | Error::Config(_) | Error::Io(_) | Error::Json(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// True when re-running the whole operation from scratch may succeed
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::TransientStoreError
    }

    /// Map to the status a request layer reports
    pub fn status(&self) -> Status {
        match self.kind() {
            ErrorKind::NotFound => Status::ResourceMissing,
            ErrorKind::InvalidArgument | ErrorKind::ConstraintViolation => {
                Status::RequestRejected
            }
            ErrorKind::TransientStoreError | ErrorKind::Internal => Status::InternalFailure,
        }
    }
}

/// Check if a driver message describes a condition that goes away on retry
fn is_transient_message(lower: &str) -> bool {
    lower.contains("conflict")
        || lower.contains("database is locked")
        || lower.contains("resource temporarily unavailable")
        || lower.contains("could not set lock")
        || lower.contains("interrupted")
}

/// Check if a driver message describes a rejected write
fn is_constraint_message(lower: &str) -> bool {
    lower.contains("constraint error")
        || lower.contains("violates")
        || lower.contains("duplicate key")
        || lower.contains("check constraint")
}

impl From<duckdb::Error> for Error {
    fn from(err: duckdb::Error) -> Self {
        if let duckdb::Error::QueryReturnedNoRows = err {
            return Error::NotFound("query returned no rows".to_string());
        }

        let msg = err.to_string();
        let lower = msg.to_lowercase();
        if is_transient_message(&lower) {
            Error::Transient(msg)
        } else if is_constraint_message(&lower) {
            Error::ConstraintViolation(msg)
        } else {
            Error::Database(msg)
        }
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;
