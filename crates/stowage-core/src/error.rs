//! Error types module
//!
//! This module provides the error vocabulary shared by every Stowage crate:
//! the validation errors raised before a request reaches a backend, the
//! stable error codes exposed to callers, and the `ErrorMetadata` trait that
//! lets an error describe how it should be reported.

use std::fmt::{Display, Formatter, Result as FmtResult};

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like cancellation or transient failures
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error reporting - defines how an error should be presented
/// This trait allows errors to self-describe their reporting characteristics
pub trait ErrorMetadata {
    /// HTTP status code a server embedding the client should map this error to
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "UPLOAD_FAILED")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

/// Stable error codes exposed to callers of the auditable client.
///
/// The underlying cause is always preserved separately; only the code is part
/// of the public contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    UploadFailed,
    DeleteFailed,
    GetInfoFailed,
    HealthCheckFailed,
    CloseFailed,
    OperationCancelled,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::UploadFailed => "UPLOAD_FAILED",
            ErrorCode::DeleteFailed => "DELETE_FAILED",
            ErrorCode::GetInfoFailed => "GET_INFO_FAILED",
            ErrorCode::HealthCheckFailed => "HEALTH_CHECK_FAILED",
            ErrorCode::CloseFailed => "CLOSE_FAILED",
            ErrorCode::OperationCancelled => "OPERATION_CANCELLED",
        }
    }
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Rejections raised before any network call is made.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("file size {size} exceeds maximum allowed size {max}")]
    FileTooLarge { size: u64, max: u64 },

    #[error("content type {0} is not allowed")]
    ContentTypeNotAllowed(String),

    #[error("filename {0:?} is not valid")]
    InvalidFilename(String),
}

impl ErrorMetadata for ValidationError {
    fn http_status_code(&self) -> u16 {
        match self {
            ValidationError::FileTooLarge { .. } => 413,
            ValidationError::ContentTypeNotAllowed(_) => 415,
            ValidationError::InvalidFilename(_) => 400,
        }
    }

    fn error_code(&self) -> &'static str {
        ErrorCode::ValidationError.as_str()
    }

    fn is_recoverable(&self) -> bool {
        false
    }

    fn log_level(&self) -> LogLevel {
        LogLevel::Debug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_strings() {
        assert_eq!(ErrorCode::ValidationError.as_str(), "VALIDATION_ERROR");
        assert_eq!(ErrorCode::UploadFailed.as_str(), "UPLOAD_FAILED");
        assert_eq!(ErrorCode::DeleteFailed.as_str(), "DELETE_FAILED");
        assert_eq!(ErrorCode::GetInfoFailed.as_str(), "GET_INFO_FAILED");
        assert_eq!(ErrorCode::UploadFailed.to_string(), "UPLOAD_FAILED");
    }

    #[test]
    fn test_error_code_serializes_as_screaming_snake_case() {
        let json = serde_json::to_string(&ErrorCode::GetInfoFailed).unwrap();
        assert_eq!(json, "\"GET_INFO_FAILED\"");
    }

    #[test]
    fn test_validation_error_metadata() {
        let err = ValidationError::FileTooLarge { size: 20, max: 10 };
        assert_eq!(err.http_status_code(), 413);
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        assert!(!err.is_recoverable());
        assert_eq!(err.log_level(), LogLevel::Debug);
        assert_eq!(
            err.to_string(),
            "file size 20 exceeds maximum allowed size 10"
        );

        let err = ValidationError::ContentTypeNotAllowed("application/pdf".to_string());
        assert_eq!(err.http_status_code(), 415);
        assert_eq!(err.to_string(), "content type application/pdf is not allowed");
    }
}
