//! Errors returned by the auditable client.

use stowage_core::{ErrorCode, ErrorMetadata, LogLevel, ValidationError};
use stowage_infra::CancelReason;
use thiserror::Error;

use crate::traits::StorageError;

/// Classified failure of an audited operation.
///
/// Exactly one of these is produced per failed call; the backend cause is
/// kept as the error source.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{code}: {source}")]
    Operation {
        code: ErrorCode,
        #[source]
        source: StorageError,
    },

    /// The backend kept failing until the retry budget ran out.
    #[error("{code} after {attempts} attempt(s): {source}")]
    RetriesExhausted {
        code: ErrorCode,
        attempts: u32,
        #[source]
        source: StorageError,
    },

    #[error("{operation} cancelled after {attempts} attempt(s): {reason}")]
    Cancelled {
        operation: ErrorCode,
        reason: CancelReason,
        attempts: u32,
    },
}

impl ClientError {
    pub fn operation(code: ErrorCode, source: StorageError) -> Self {
        ClientError::Operation { code, source }
    }

    /// Stable code callers can branch on.
    pub fn code(&self) -> ErrorCode {
        match self {
            ClientError::Validation(_) => ErrorCode::ValidationError,
            ClientError::Operation { code, .. } | ClientError::RetriesExhausted { code, .. } => {
                *code
            }
            ClientError::Cancelled { .. } => ErrorCode::OperationCancelled,
        }
    }

    /// The backend error, when the failure came from the backend.
    pub fn storage_error(&self) -> Option<&StorageError> {
        match self {
            ClientError::Operation { source, .. }
            | ClientError::RetriesExhausted { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Attempts made before giving up, for retried or cancelled operations.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            ClientError::RetriesExhausted { attempts, .. }
            | ClientError::Cancelled { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.storage_error(), Some(StorageError::NotFound(_)))
    }
}

impl ErrorMetadata for ClientError {
    fn http_status_code(&self) -> u16 {
        match self {
            ClientError::Validation(e) => e.http_status_code(),
            ClientError::Operation { source, .. }
            | ClientError::RetriesExhausted { source, .. } => match source {
                StorageError::NotFound(_) => 404,
                StorageError::Read(_) | StorageError::InvalidKey(_) => 400,
                StorageError::Transport(_) | StorageError::Closed => 503,
                StorageError::Backend(_) => 502,
                StorageError::Config(_) => 500,
            },
            ClientError::Cancelled { reason, .. } => match reason {
                CancelReason::DeadlineExceeded => 504,
                CancelReason::Cancelled => 499,
            },
        }
    }

    fn error_code(&self) -> &'static str {
        self.code().as_str()
    }

    fn is_recoverable(&self) -> bool {
        match self {
            ClientError::Validation(_) => false,
            ClientError::Operation { source, .. }
            | ClientError::RetriesExhausted { source, .. } => source.is_transport(),
            ClientError::Cancelled { .. } => true,
        }
    }

    fn log_level(&self) -> LogLevel {
        match self {
            ClientError::Validation(_) => LogLevel::Debug,
            ClientError::Operation { source, .. }
            | ClientError::RetriesExhausted { source, .. } => match source {
                StorageError::NotFound(_) | StorageError::InvalidKey(_) => LogLevel::Debug,
                StorageError::Transport(_) | StorageError::Closed => LogLevel::Warn,
                _ => LogLevel::Error,
            },
            ClientError::Cancelled { .. } => LogLevel::Warn,
        }
    }
}

/// Result type for audited operations
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_codes() {
        let validation = ClientError::from(ValidationError::FileTooLarge { size: 2, max: 1 });
        assert_eq!(validation.code(), ErrorCode::ValidationError);
        assert_eq!(validation.http_status_code(), 413);
        assert!(!validation.is_recoverable());

        let op = ClientError::operation(
            ErrorCode::DeleteFailed,
            StorageError::Transport("connection reset".to_string()),
        );
        assert_eq!(op.code(), ErrorCode::DeleteFailed);
        assert_eq!(op.error_code(), "DELETE_FAILED");
        assert_eq!(op.http_status_code(), 503);
        assert!(op.is_recoverable());
        assert_eq!(op.log_level(), LogLevel::Warn);
    }

    #[test]
    fn test_source_is_preserved() {
        let op = ClientError::operation(
            ErrorCode::GetInfoFailed,
            StorageError::NotFound("a.png".to_string()),
        );
        assert!(op.is_not_found());
        assert_eq!(op.http_status_code(), 404);
        let source = op.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("File not found: a.png"));
        assert!(op.to_string().starts_with("GET_INFO_FAILED"));
    }

    #[test]
    fn test_retries_exhausted_keeps_code_and_attempts() {
        let exhausted = ClientError::RetriesExhausted {
            code: ErrorCode::DeleteFailed,
            attempts: 3,
            source: StorageError::Transport("connection refused".to_string()),
        };
        assert_eq!(exhausted.code(), ErrorCode::DeleteFailed);
        assert_eq!(exhausted.attempts(), Some(3));
        assert_eq!(exhausted.http_status_code(), 503);
        assert!(exhausted.storage_error().is_some_and(StorageError::is_transport));
        assert!(exhausted.to_string().starts_with("DELETE_FAILED after 3 attempt(s)"));
    }

    #[test]
    fn test_cancelled() {
        let cancelled = ClientError::Cancelled {
            operation: ErrorCode::DeleteFailed,
            reason: CancelReason::DeadlineExceeded,
            attempts: 2,
        };
        assert_eq!(cancelled.code(), ErrorCode::OperationCancelled);
        assert_eq!(cancelled.http_status_code(), 504);
        assert!(cancelled.storage_error().is_none());
        assert_eq!(cancelled.attempts(), Some(2));
    }
}
