//! Audit event model and taxonomy.

use std::fmt::{Display, Formatter, Result as FmtResult};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use stowage_core::constants::SYSTEM_ACTOR;
use uuid::Uuid;

/// Audit event types for categorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    // File operations
    FileUploaded,
    FileDeleted,
    FileAccessed,
    FileDownloaded,
    FileUpdated,
    FileCopied,
    FileMoved,

    // Storage
    StorageError,
    StorageQuotaExceeded,
    StorageAccessDenied,
    StorageConfigChanged,
    StorageMaintenance,
    StorageFull,

    // Security
    MalwareDetected,
    SuspiciousFile,
    UnauthorizedAccess,
    DataBreach,

    // Performance
    UploadSlow,
    UploadTimeout,
    OperationSlow,
    HighResourceUsage,
}

/// Event severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AuditEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEventType::FileUploaded => "file_uploaded",
            AuditEventType::FileDeleted => "file_deleted",
            AuditEventType::FileAccessed => "file_accessed",
            AuditEventType::FileDownloaded => "file_downloaded",
            AuditEventType::FileUpdated => "file_updated",
            AuditEventType::FileCopied => "file_copied",
            AuditEventType::FileMoved => "file_moved",
            AuditEventType::StorageError => "storage_error",
            AuditEventType::StorageQuotaExceeded => "storage_quota_exceeded",
            AuditEventType::StorageAccessDenied => "storage_access_denied",
            AuditEventType::StorageConfigChanged => "storage_config_changed",
            AuditEventType::StorageMaintenance => "storage_maintenance",
            AuditEventType::StorageFull => "storage_full",
            AuditEventType::MalwareDetected => "malware_detected",
            AuditEventType::SuspiciousFile => "suspicious_file",
            AuditEventType::UnauthorizedAccess => "unauthorized_access",
            AuditEventType::DataBreach => "data_breach",
            AuditEventType::UploadSlow => "upload_slow",
            AuditEventType::UploadTimeout => "upload_timeout",
            AuditEventType::OperationSlow => "operation_slow",
            AuditEventType::HighResourceUsage => "high_resource_usage",
        }
    }

    pub fn severity(&self) -> AuditSeverity {
        use AuditEventType::*;
        match self {
            FileUploaded | FileAccessed | FileDownloaded | FileCopied | FileMoved => {
                AuditSeverity::Low
            }
            FileDeleted | FileUpdated => AuditSeverity::Medium,
            StorageConfigChanged | StorageMaintenance => AuditSeverity::Medium,
            StorageError => AuditSeverity::High,
            StorageQuotaExceeded | StorageAccessDenied | StorageFull => AuditSeverity::Critical,
            SuspiciousFile => AuditSeverity::High,
            MalwareDetected | UnauthorizedAccess | DataBreach => AuditSeverity::Critical,
            UploadSlow | OperationSlow => AuditSeverity::Medium,
            UploadTimeout | HighResourceUsage => AuditSeverity::High,
        }
    }

    pub fn is_file_event(&self) -> bool {
        use AuditEventType::*;
        matches!(
            self,
            FileUploaded
                | FileDeleted
                | FileAccessed
                | FileDownloaded
                | FileUpdated
                | FileCopied
                | FileMoved
        )
    }

    pub fn is_storage_event(&self) -> bool {
        use AuditEventType::*;
        matches!(
            self,
            StorageError
                | StorageQuotaExceeded
                | StorageAccessDenied
                | StorageConfigChanged
                | StorageMaintenance
                | StorageFull
        )
    }

    pub fn is_security_event(&self) -> bool {
        use AuditEventType::*;
        matches!(
            self,
            MalwareDetected | SuspiciousFile | UnauthorizedAccess | DataBreach
        )
    }

    /// `storage_full` counts as both a storage and a performance event.
    pub fn is_performance_event(&self) -> bool {
        use AuditEventType::*;
        matches!(
            self,
            UploadSlow | UploadTimeout | OperationSlow | StorageFull | HighResourceUsage
        )
    }
}

impl Display for AuditEventType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Structured audit event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event_type: AuditEventType,
    pub severity: AuditSeverity,
    /// Never empty; unknown callers are recorded as `system`.
    pub actor_id: String,
    /// `file`, `storage` or `config`
    pub resource: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl AuditEvent {
    /// Create a new successful event with severity derived from its type
    pub fn new(event_type: AuditEventType, actor_id: &str, resource: &str) -> Self {
        let actor_id = if actor_id.trim().is_empty() {
            SYSTEM_ACTOR
        } else {
            actor_id
        };

        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event_type,
            severity: event_type.severity(),
            actor_id: actor_id.to_string(),
            resource: resource.to_string(),
            resource_id: None,
            success: true,
            reason: None,
            metadata: Map::new(),
        }
    }

    pub fn with_resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Mark as failure
    pub fn with_failure(mut self, reason: impl Into<String>) -> Self {
        self.success = false;
        self.reason = Some(reason.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Metadata value by key, if present.
    pub fn metadata_value(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_serializes_snake_case() {
        let json = serde_json::to_string(&AuditEventType::StorageConfigChanged).unwrap();
        assert_eq!(json, "\"storage_config_changed\"");
        let json = serde_json::to_string(&AuditEventType::OperationSlow).unwrap();
        assert_eq!(json, "\"operation_slow\"");
        assert_eq!(AuditEventType::FileUploaded.to_string(), "file_uploaded");
    }

    #[test]
    fn test_severity_mapping() {
        assert_eq!(AuditEventType::FileUploaded.severity(), AuditSeverity::Low);
        assert_eq!(AuditEventType::FileDeleted.severity(), AuditSeverity::Medium);
        assert_eq!(AuditEventType::StorageError.severity(), AuditSeverity::High);
        assert_eq!(
            AuditEventType::StorageQuotaExceeded.severity(),
            AuditSeverity::Critical
        );
        assert_eq!(AuditEventType::DataBreach.severity(), AuditSeverity::Critical);
        assert_eq!(AuditEventType::OperationSlow.severity(), AuditSeverity::Medium);
        assert!(AuditSeverity::Critical > AuditSeverity::Low);
    }

    #[test]
    fn test_category_predicates() {
        assert!(AuditEventType::FileMoved.is_file_event());
        assert!(!AuditEventType::FileMoved.is_storage_event());
        assert!(AuditEventType::StorageFull.is_storage_event());
        assert!(AuditEventType::StorageFull.is_performance_event());
        assert!(AuditEventType::SuspiciousFile.is_security_event());
        assert!(!AuditEventType::StorageError.is_security_event());
    }

    #[test]
    fn test_empty_actor_becomes_system() {
        let event = AuditEvent::new(AuditEventType::FileAccessed, "", "file");
        assert_eq!(event.actor_id, "system");

        let event = AuditEvent::new(AuditEventType::FileAccessed, "alice", "file")
            .with_resource_id("a.png")
            .with_failure("denied");
        assert_eq!(event.actor_id, "alice");
        assert!(!event.success);
        assert_eq!(event.reason.as_deref(), Some("denied"));
        assert_eq!(event.severity, AuditSeverity::Low);
    }
}
