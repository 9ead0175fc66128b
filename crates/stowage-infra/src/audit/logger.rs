//! Storage audit logger
//!
//! Turns per-operation metadata into [`AuditEvent`]s and hands them to the
//! configured sink. Without a sink every method is a no-op.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};

use super::events::{AuditEvent, AuditEventType};
use super::metadata::{
    FileOperationMetadata, PerformanceEventMetadata, SecurityEventMetadata, StorageErrorMetadata,
};
use super::sink::AuditSink;

const REASON_SUCCESS: &str = "Operation completed successfully";

#[derive(Clone)]
pub struct AuditLogger {
    service: String,
    sink: Option<Arc<dyn AuditSink>>,
    config: Map<String, Value>,
}

impl AuditLogger {
    pub fn new(
        service: impl Into<String>,
        sink: Option<Arc<dyn AuditSink>>,
        config: Map<String, Value>,
    ) -> Self {
        Self {
            service: service.into(),
            sink,
            config,
        }
    }

    /// A logger that records nothing.
    pub fn disabled(service: impl Into<String>) -> Self {
        Self::new(service, None, Map::new())
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    pub fn log_file_upload(
        &self,
        actor: &str,
        metadata: &FileOperationMetadata,
        error: Option<&str>,
    ) {
        self.log_file_event(
            AuditEventType::FileUploaded,
            AuditEventType::StorageError,
            "upload_failed",
            actor,
            &metadata.file_path,
            metadata,
            error,
        );
    }

    pub fn log_file_delete(
        &self,
        actor: &str,
        metadata: &FileOperationMetadata,
        error: Option<&str>,
    ) {
        self.log_file_event(
            AuditEventType::FileDeleted,
            AuditEventType::StorageError,
            "delete_failed",
            actor,
            &metadata.file_path,
            metadata,
            error,
        );
    }

    /// A failed access is recorded as `storage_access_denied`.
    pub fn log_file_access(
        &self,
        actor: &str,
        metadata: &FileOperationMetadata,
        error: Option<&str>,
    ) {
        self.log_file_event(
            AuditEventType::FileAccessed,
            AuditEventType::StorageAccessDenied,
            "access_denied",
            actor,
            &metadata.file_path,
            metadata,
            error,
        );
    }

    pub fn log_file_download(
        &self,
        actor: &str,
        metadata: &FileOperationMetadata,
        error: Option<&str>,
    ) {
        self.log_file_event(
            AuditEventType::FileDownloaded,
            AuditEventType::StorageError,
            "download_failed",
            actor,
            &metadata.file_path,
            metadata,
            error,
        );
    }

    pub fn log_storage_error(&self, actor: &str, metadata: &StorageErrorMetadata) {
        let Some(sink) = &self.sink else {
            return;
        };

        let mut map = metadata.to_map();
        self.stamp(&mut map);

        let mut event = AuditEvent::new(AuditEventType::StorageError, actor, "storage")
            .with_failure(metadata.error_message.clone())
            .with_metadata(map);
        if let Some(path) = metadata.context.get("file_path").and_then(Value::as_str) {
            event = event.with_resource_id(path);
        }

        sink.record_event(&event);
    }

    pub fn log_security_event(
        &self,
        actor: &str,
        event_type: AuditEventType,
        metadata: &SecurityEventMetadata,
    ) {
        let Some(sink) = &self.sink else {
            return;
        };

        let mut map = metadata.to_map();
        map.insert("service".to_string(), Value::from(self.service.clone()));

        let mut event = AuditEvent::new(event_type, actor, "file")
            .with_reason(format!("Security event: {}", metadata.threat_type))
            .with_metadata(map);
        event.success = !metadata.blocked;

        sink.record_event(&event);
    }

    pub fn log_performance_event(
        &self,
        actor: &str,
        event_type: AuditEventType,
        metadata: &PerformanceEventMetadata,
    ) {
        let Some(sink) = &self.sink else {
            return;
        };

        let mut map = metadata.to_map();
        map.insert("service".to_string(), Value::from(self.service.clone()));

        let event = AuditEvent::new(event_type, actor, "storage")
            .with_reason(format!(
                "{} took {}ms (threshold {}ms)",
                metadata.operation, metadata.duration_ms, metadata.threshold_ms
            ))
            .with_metadata(map);

        sink.record_event(&event);
    }

    pub fn log_quota_exceeded(
        &self,
        actor: &str,
        current_usage: u64,
        quota_limit: u64,
        metadata: &FileOperationMetadata,
    ) {
        let Some(sink) = &self.sink else {
            return;
        };

        let mut map = metadata.to_map();
        self.stamp(&mut map);
        map.insert("current_usage".to_string(), Value::from(current_usage));
        map.insert("quota_limit".to_string(), Value::from(quota_limit));
        if quota_limit > 0 {
            map.insert(
                "percentage_used".to_string(),
                Value::from(current_usage as f64 / quota_limit as f64 * 100.0),
            );
        }

        let event = AuditEvent::new(AuditEventType::StorageQuotaExceeded, actor, "storage")
            .with_failure("Storage quota exceeded")
            .with_metadata(map);

        sink.record_event(&event);
    }

    pub fn log_config_change(
        &self,
        actor: &str,
        old_config: Map<String, Value>,
        new_config: Map<String, Value>,
    ) {
        let Some(sink) = &self.sink else {
            return;
        };

        let mut map = Map::new();
        if let Some(action) = new_config.get("action").cloned() {
            map.insert("action".to_string(), action);
        }
        map.insert("old_config".to_string(), Value::Object(old_config));
        map.insert("new_config".to_string(), Value::Object(new_config));
        map.insert("service".to_string(), Value::from(self.service.clone()));
        map.insert("timestamp".to_string(), Value::from(Utc::now().to_rfc3339()));

        let event = AuditEvent::new(AuditEventType::StorageConfigChanged, actor, "config")
            .with_reason("Configuration updated")
            .with_metadata(map);

        sink.record_event(&event);
    }

    #[allow(clippy::too_many_arguments)]
    fn log_file_event(
        &self,
        success_type: AuditEventType,
        failure_type: AuditEventType,
        error_type: &str,
        actor: &str,
        resource_id: &str,
        metadata: &FileOperationMetadata,
        error: Option<&str>,
    ) {
        let Some(sink) = &self.sink else {
            return;
        };

        let mut map = metadata.to_map();
        self.stamp(&mut map);

        let event = match error {
            None => AuditEvent::new(success_type, actor, "file").with_reason(REASON_SUCCESS),
            Some(error) => {
                map.insert("error".to_string(), Value::from(error));
                map.insert("error_type".to_string(), Value::from(error_type));
                AuditEvent::new(failure_type, actor, "file").with_failure(error)
            }
        };

        let mut event = event.with_metadata(map);
        if !resource_id.is_empty() {
            event = event.with_resource_id(resource_id);
        }

        sink.record_event(&event);
    }

    /// Adds the service name and, when present, the static configuration.
    fn stamp(&self, map: &mut Map<String, Value>) {
        map.insert("service".to_string(), Value::from(self.service.clone()));
        if !self.config.is_empty() {
            map.insert("config".to_string(), Value::Object(self.config.clone()));
        }
    }
}

impl fmt::Debug for AuditLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditLogger")
            .field("service", &self.service)
            .field("enabled", &self.is_enabled())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditSink;
    use serde_json::json;

    fn logger() -> (AuditLogger, Arc<MemoryAuditSink>) {
        let sink = Arc::new(MemoryAuditSink::new());
        let mut config = Map::new();
        config.insert("environment".to_string(), json!("test"));
        let logger = AuditLogger::new("media", Some(sink.clone() as Arc<dyn AuditSink>), config);
        (logger, sink)
    }

    #[test]
    fn test_disabled_logger_records_nothing() {
        let logger = AuditLogger::disabled("media");
        assert!(!logger.is_enabled());
        logger.log_file_upload("alice", &FileOperationMetadata::default(), None);
        logger.log_config_change("alice", Map::new(), Map::new());
    }

    #[test]
    fn test_file_upload_success() {
        let (logger, sink) = logger();
        let metadata = FileOperationMetadata {
            filename: "a.png".to_string(),
            file_size: 10,
            file_path: "images/a.png".to_string(),
            ..Default::default()
        };

        logger.log_file_upload("alice", &metadata, None);

        let events = sink.events();
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.event_type, AuditEventType::FileUploaded);
        assert!(event.success);
        assert_eq!(event.resource, "file");
        assert_eq!(event.resource_id.as_deref(), Some("images/a.png"));
        assert_eq!(event.metadata_str("service"), Some("media"));
        assert_eq!(event.metadata_value("config"), Some(&json!({"environment": "test"})));
    }

    #[test]
    fn test_failed_access_is_access_denied() {
        let (logger, sink) = logger();
        logger.log_file_access(
            "bob",
            &FileOperationMetadata::for_path("x.png", "media"),
            Some("forbidden"),
        );

        let event = &sink.events()[0];
        assert_eq!(event.event_type, AuditEventType::StorageAccessDenied);
        assert!(!event.success);
        assert_eq!(event.metadata_str("error_type"), Some("access_denied"));
    }

    #[test]
    fn test_file_download_success_and_failure() {
        let (logger, sink) = logger();
        let metadata = FileOperationMetadata {
            file_size: 2048,
            ..FileOperationMetadata::for_path("docs/report.pdf", "media")
        };

        logger.log_file_download("alice", &metadata, None);
        logger.log_file_download("alice", &metadata, Some("connection reset"));

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, AuditEventType::FileDownloaded);
        assert!(events[0].success);
        assert_eq!(events[0].resource_id.as_deref(), Some("docs/report.pdf"));
        assert_eq!(events[0].metadata_value("file_size"), Some(&json!(2048)));

        assert_eq!(events[1].event_type, AuditEventType::StorageError);
        assert!(!events[1].success);
        assert_eq!(events[1].reason.as_deref(), Some("connection reset"));
        assert_eq!(events[1].metadata_str("error_type"), Some("download_failed"));
    }

    #[test]
    fn test_storage_error_event() {
        let (logger, sink) = logger();
        let mut context = Map::new();
        context.insert("file_path".to_string(), json!("docs/a.pdf"));

        logger.log_storage_error(
            "alice",
            &StorageErrorMetadata {
                operation: "upload".to_string(),
                error_code: "UPLOAD_FAILED".to_string(),
                error_message: "connection reset".to_string(),
                retry_count: 0,
                duration_ms: 5,
                context,
            },
        );

        let event = &sink.events()[0];
        assert_eq!(event.event_type, AuditEventType::StorageError);
        assert_eq!(event.resource, "storage");
        assert_eq!(event.resource_id.as_deref(), Some("docs/a.pdf"));
        assert_eq!(event.reason.as_deref(), Some("connection reset"));
        assert_eq!(event.metadata_str("error_code"), Some("UPLOAD_FAILED"));
    }

    #[test]
    fn test_security_event_blocked_is_failure() {
        let (logger, sink) = logger();
        logger.log_security_event(
            "alice",
            AuditEventType::MalwareDetected,
            &SecurityEventMetadata {
                threat_type: "trojan".to_string(),
                threat_level: "high".to_string(),
                blocked: true,
                action: "quarantine".to_string(),
                ..Default::default()
            },
        );

        let event = &sink.events()[0];
        assert!(!event.success);
        assert_eq!(event.reason.as_deref(), Some("Security event: trojan"));
    }

    #[test]
    fn test_quota_and_config_change() {
        let (logger, sink) = logger();
        logger.log_quota_exceeded("alice", 150, 100, &FileOperationMetadata::default());

        let mut new_config = Map::new();
        new_config.insert("action".to_string(), json!("client_shutdown"));
        logger.log_config_change("system", Map::new(), new_config);

        let events = sink.events();
        assert_eq!(events[0].event_type, AuditEventType::StorageQuotaExceeded);
        assert_eq!(events[0].metadata_value("percentage_used"), Some(&json!(150.0)));
        assert_eq!(events[1].event_type, AuditEventType::StorageConfigChanged);
        assert_eq!(events[1].resource, "config");
        assert_eq!(events[1].metadata_str("action"), Some("client_shutdown"));
    }
}
