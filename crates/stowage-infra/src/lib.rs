//! Stowage Infrastructure Library
//!
//! This crate provides shared infrastructure components used by the storage client:
//! - Resilient operation executor (retry, backoff, jitter, cancellation)
//! - Audit trail (event model, sinks, logger)
//! - Telemetry initialization

#[cfg(feature = "retry")]
pub mod retry;

#[cfg(feature = "audit")]
pub mod audit;

#[cfg(feature = "observability-basic")]
pub mod telemetry;

// Re-export commonly used types
#[cfg(feature = "retry")]
pub use retry::{CancelReason, RetryError, RetryExecutor, RetryOutcome};

#[cfg(feature = "audit")]
pub use audit::{AuditEvent, AuditEventType, AuditLogger, AuditSink};

#[cfg(feature = "observability-basic")]
pub use telemetry::init_telemetry;
