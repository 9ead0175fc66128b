//! Per-call operation metadata.
//!
//! These structs are built for a single operation, flattened into an
//! [`AuditEvent`](super::AuditEvent)'s metadata map by the audit logger, and
//! then dropped.

use serde::Serialize;
use serde_json::{Map, Value};

/// Metadata for file operations
#[derive(Debug, Clone, Default, Serialize)]
pub struct FileOperationMetadata {
    #[serde(rename = "file_name", skip_serializing_if = "String::is_empty")]
    pub filename: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub file_size: u64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub content_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub file_path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub bucket_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub throughput_mbps: Option<f64>,
    /// Caller-supplied metadata, merged at the top level.
    #[serde(flatten)]
    pub additional: Map<String, Value>,
}

impl FileOperationMetadata {
    pub fn for_path(file_path: impl Into<String>, bucket_name: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            bucket_name: bucket_name.into(),
            ..Default::default()
        }
    }

    pub fn to_map(&self) -> Map<String, Value> {
        to_object(self)
    }
}

/// Metadata for storage errors
#[derive(Debug, Clone, Serialize)]
pub struct StorageErrorMetadata {
    pub operation: String,
    pub error_code: String,
    pub error_message: String,
    pub retry_count: u32,
    pub duration_ms: u64,
    #[serde(flatten)]
    pub context: Map<String, Value>,
}

impl StorageErrorMetadata {
    pub fn to_map(&self) -> Map<String, Value> {
        to_object(self)
    }
}

/// Metadata for performance events
#[derive(Debug, Clone, Default, Serialize)]
pub struct PerformanceEventMetadata {
    pub operation: String,
    pub duration_ms: u64,
    pub file_size: u64,
    pub throughput_mbps: f64,
    pub concurrency: u32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub resource_usage: String,
    pub threshold_ms: u64,
    #[serde(flatten)]
    pub additional: Map<String, Value>,
}

impl PerformanceEventMetadata {
    pub fn to_map(&self) -> Map<String, Value> {
        to_object(self)
    }
}

/// Metadata for security events
#[derive(Debug, Clone, Default, Serialize)]
pub struct SecurityEventMetadata {
    pub threat_type: String,
    pub threat_level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_result: Option<String>,
    pub blocked: bool,
    pub action: String,
    #[serde(flatten)]
    pub additional: Map<String, Value>,
}

impl SecurityEventMetadata {
    pub fn to_map(&self) -> Map<String, Value> {
        to_object(self)
    }
}

fn is_zero(value: &u64) -> bool {
    *value == 0
}

fn to_object<T: Serialize>(value: &T) -> Map<String, Value> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}
