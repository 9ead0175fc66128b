//! Storage audit trail
//!
//! - `events`: event model, taxonomy and severities
//! - `metadata`: per-operation metadata flattened into events
//! - `sink`: where events go (`tracing`, memory)
//! - `logger`: the facade used by the auditable storage client

pub mod events;
pub mod logger;
pub mod metadata;
pub mod sink;

pub use events::{AuditEvent, AuditEventType, AuditSeverity};
pub use logger::AuditLogger;
pub use metadata::{
    FileOperationMetadata, PerformanceEventMetadata, SecurityEventMetadata, StorageErrorMetadata,
};
pub use sink::{AuditSink, MemoryAuditSink, TracingAuditSink};
