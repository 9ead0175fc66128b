use std::error::Error;
use std::fmt::{self, Display};
use std::time::Duration;

/// Why an execution stopped before the operation could succeed or exhaust
/// its attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CancelReason {
    #[error("operation cancelled")]
    Cancelled,
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

/// Terminal error of an execution.
#[derive(Debug)]
pub enum RetryError<E> {
    /// The cancellation token fired or the deadline passed.
    Cancelled(CancelReason),
    /// The last error returned by the operation.
    Operation(E),
}

impl<E> RetryError<E> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RetryError::Cancelled(_))
    }

    pub fn cancel_reason(&self) -> Option<CancelReason> {
        match self {
            RetryError::Cancelled(reason) => Some(*reason),
            RetryError::Operation(_) => None,
        }
    }

    pub fn operation_error(&self) -> Option<&E> {
        match self {
            RetryError::Cancelled(_) => None,
            RetryError::Operation(e) => Some(e),
        }
    }

    pub fn into_operation_error(self) -> Option<E> {
        match self {
            RetryError::Cancelled(_) => None,
            RetryError::Operation(e) => Some(e),
        }
    }
}

impl<E: Display> Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryError::Cancelled(reason) => Display::fmt(reason, f),
            RetryError::Operation(e) => Display::fmt(e, f),
        }
    }
}

impl<E> Error for RetryError<E>
where
    E: Error + 'static,
{
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RetryError::Cancelled(reason) => Some(reason),
            RetryError::Operation(e) => Some(e),
        }
    }
}

/// Result of one executor call.
///
/// `result` carries either the success value or the terminal error, so an
/// error is present exactly when the execution did not succeed.
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    pub result: Result<T, RetryError<E>>,
    /// Number of times the operation was invoked.
    pub attempts_used: u32,
    /// Wall-clock time from the start of the call until it returned.
    pub elapsed: Duration,
    /// Sum of the backoff delays that were scheduled.
    pub total_delay: Duration,
}

impl<T, E> RetryOutcome<T, E> {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }

    pub fn last_error(&self) -> Option<&RetryError<E>> {
        self.result.as_ref().err()
    }

    pub fn into_result(self) -> Result<T, RetryError<E>> {
        self.result
    }
}
