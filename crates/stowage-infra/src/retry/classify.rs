//! Retryability classification.
//!
//! Advisory helpers for callers deciding whether an error is worth retrying.
//! The executor itself retries every failure.

use std::error::Error;
use std::io;

const RETRYABLE_PATTERNS: &[&str] = &[
    "connection refused",
    "connection reset",
    "timeout",
    "timed out",
    "temporary",
    "transient",
    "retry later",
    "service unavailable",
    "rate limit",
    "too many requests",
    "network unreachable",
    "no route to host",
    "deadline exceeded",
];

const NETWORK_PATTERNS: &[&str] = &[
    "connection refused",
    "connection reset",
    "network unreachable",
    "no route to host",
    "host unreachable",
    "connection timed out",
    "read timeout",
    "write timeout",
];

const TIMEOUT_PATTERNS: &[&str] = &["timeout", "timed out", "deadline exceeded"];

const TEMPORARY_PATTERNS: &[&str] = &[
    "temporary",
    "transient",
    "retry later",
    "service unavailable",
    "rate limit",
    "too many requests",
];

/// Whether any error in the `source()` chain looks transient.
pub fn is_retryable_error(err: &(dyn Error + 'static)) -> bool {
    any_in_chain(err, |e| {
        io_kind(e).is_some_and(is_retryable_kind) || matches_any(e, RETRYABLE_PATTERNS)
    })
}

pub fn is_network_error(err: &(dyn Error + 'static)) -> bool {
    any_in_chain(err, |e| {
        io_kind(e).is_some_and(|kind| {
            matches!(
                kind,
                io::ErrorKind::ConnectionRefused
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::NotConnected
                    | io::ErrorKind::BrokenPipe
            )
        }) || matches_any(e, NETWORK_PATTERNS)
    })
}

pub fn is_timeout_error(err: &(dyn Error + 'static)) -> bool {
    any_in_chain(err, |e| {
        io_kind(e) == Some(io::ErrorKind::TimedOut) || matches_any(e, TIMEOUT_PATTERNS)
    })
}

pub fn is_temporary_error(err: &(dyn Error + 'static)) -> bool {
    any_in_chain(err, |e| {
        io_kind(e) == Some(io::ErrorKind::Interrupted) || matches_any(e, TEMPORARY_PATTERNS)
    })
}

fn is_retryable_kind(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::TimedOut
            | io::ErrorKind::NotConnected
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::Interrupted
    )
}

fn any_in_chain<F>(err: &(dyn Error + 'static), predicate: F) -> bool
where
    F: Fn(&(dyn Error + 'static)) -> bool,
{
    let mut current = Some(err);
    while let Some(e) = current {
        if predicate(e) {
            return true;
        }
        current = e.source();
    }
    false
}

fn io_kind(err: &(dyn Error + 'static)) -> Option<io::ErrorKind> {
    err.downcast_ref::<io::Error>().map(io::Error::kind)
}

fn matches_any(err: &(dyn Error + 'static), patterns: &[&str]) -> bool {
    let message = err.to_string().to_lowercase();
    patterns.iter().any(|p| message.contains(p))
}
