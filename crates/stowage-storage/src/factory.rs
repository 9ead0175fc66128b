//! Storage client construction
//!
//! The backend is chosen by an explicit [`ClientKind`], never by global state.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Map;
use stowage_core::{FileInfo, StorageConfig};
use stowage_infra::audit::{AuditLogger, AuditSink, TracingAuditSink};

use crate::audited::AuditedStorage;
use crate::memory::MemoryStorage;
#[cfg(feature = "storage-s3")]
use crate::S3Storage;
use crate::{Storage, StorageError, StorageResult};

/// Simulated latency of the development backend.
const DEVELOPMENT_LATENCY: Duration = Duration::from_millis(10);

/// Which backend a client is built on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientKind {
    /// S3 (or an S3-compatible service)
    Production,
    /// In-memory, with a small simulated latency
    Development,
    /// In-memory, seeded from [`TestData`]
    Test,
}

impl ClientKind {
    /// Kind for a deployment environment name; unknown names are
    /// development.
    pub fn from_environment(environment: &str) -> Self {
        environment.parse().unwrap_or(ClientKind::Development)
    }
}

impl FromStr for ClientKind {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "production" | "prod" => Ok(ClientKind::Production),
            "development" | "dev" => Ok(ClientKind::Development),
            "test" | "testing" => Ok(ClientKind::Test),
            other => Err(StorageError::Config(format!(
                "Unknown client kind: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for ClientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ClientKind::Production => "production",
            ClientKind::Development => "development",
            ClientKind::Test => "test",
        };
        f.write_str(s)
    }
}

/// Objects pre-seeded into a test backend.
#[derive(Debug, Clone, Default)]
pub struct TestData {
    files: Vec<FileInfo>,
}

impl TestData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(mut self, path: &str, size: u64, content_type: &str) -> Self {
        self.files.push(FileInfo {
            path: path.to_string(),
            size,
            content_type: content_type.to_string(),
            etag: Some(format!("test-etag-{}", self.files.len())),
            last_modified: Utc::now(),
            metadata: Map::new(),
        });
        self
    }

    pub fn files(&self) -> &[FileInfo] {
        &self.files
    }
}

/// Create the raw backend for `kind`.
pub fn create_backend(
    kind: ClientKind,
    config: &StorageConfig,
    test_data: Option<TestData>,
) -> StorageResult<Arc<dyn Storage>> {
    match kind {
        #[cfg(feature = "storage-s3")]
        ClientKind::Production => {
            let storage = S3Storage::from_config(config)?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-s3"))]
        ClientKind::Production => Err(StorageError::Config(
            "S3 storage backend not available (storage-s3 feature not enabled)".to_string(),
        )),

        ClientKind::Development => {
            let storage = MemoryStorage::builder()
                .with_latency(DEVELOPMENT_LATENCY)
                .with_base_url(format!(
                    "{}/{}",
                    config.base_url.trim_end_matches('/'),
                    config.bucket_name
                ))
                .build();
            Ok(Arc::new(storage))
        }

        ClientKind::Test => {
            let builder = test_data
                .unwrap_or_default()
                .files
                .into_iter()
                .fold(MemoryStorage::builder(), |builder, info| {
                    builder.with_file_info(info)
                });
            Ok(Arc::new(builder.build()))
        }
    }
}

fn audit_logger(
    config: &StorageConfig,
    service: &str,
    sink: Option<Arc<dyn AuditSink>>,
) -> AuditLogger {
    if !config.enable_audit {
        return AuditLogger::disabled(service);
    }
    let sink = sink.unwrap_or_else(|| Arc::new(TracingAuditSink));
    AuditLogger::new(service, Some(sink), config.audit_metadata.clone())
}

/// Create an audited client on the backend selected by `kind`.
///
/// The audit logger is attached only when `enable_audit` is set; without an
/// explicit `sink` events go to the `audit` tracing target.
pub fn create_client(
    kind: ClientKind,
    config: Arc<StorageConfig>,
    service: &str,
    sink: Option<Arc<dyn AuditSink>>,
    test_data: Option<TestData>,
) -> StorageResult<AuditedStorage> {
    let backend = create_backend(kind, &config, test_data)?;
    let audit = audit_logger(&config, service, sink);

    tracing::info!(
        kind = %kind,
        service = %service,
        bucket = %config.bucket_name,
        audit_enabled = audit.is_enabled(),
        "Storage client created"
    );

    let retry_policy = config.retry_policy;
    let client = AuditedStorage::new(backend, audit, config, service);
    Ok(client.with_executor(stowage_infra::RetryExecutor::new(retry_policy)))
}

/// Create a client from an existing configuration; `use_memory` selects an
/// empty in-memory backend instead of S3.
pub fn create_client_from_config(
    config: Arc<StorageConfig>,
    service: &str,
    use_memory: bool,
    sink: Option<Arc<dyn AuditSink>>,
) -> StorageResult<AuditedStorage> {
    let kind = if use_memory {
        ClientKind::Test
    } else {
        ClientKind::Production
    };
    create_client(kind, config, service, sink, None)
}

/// Load the configuration for `service` from the environment and pick the
/// backend from its `environment` setting.
pub fn create_client_from_environment(
    service: &str,
    sink: Option<Arc<dyn AuditSink>>,
) -> StorageResult<AuditedStorage> {
    let config =
        StorageConfig::for_service(service).map_err(|e| StorageError::Config(e.to_string()))?;
    let kind = ClientKind::from_environment(&config.environment);
    create_client(kind, Arc::new(config), service, sink, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StorageBackend;
    use stowage_infra::audit::MemoryAuditSink;

    #[test]
    fn test_parse_client_kind() {
        assert_eq!("prod".parse::<ClientKind>().unwrap(), ClientKind::Production);
        assert_eq!(
            "Production".parse::<ClientKind>().unwrap(),
            ClientKind::Production
        );
        assert_eq!("dev".parse::<ClientKind>().unwrap(), ClientKind::Development);
        assert_eq!("test".parse::<ClientKind>().unwrap(), ClientKind::Test);
        assert!("staging".parse::<ClientKind>().is_err());
        assert_eq!(ClientKind::from_environment("staging"), ClientKind::Development);
    }

    #[tokio::test]
    async fn test_test_client_is_seeded() {
        let data = TestData::new()
            .add_file("images/a.png", 10, "image/png")
            .add_file("images/b.png", 20, "image/png");
        let client = create_client(
            ClientKind::Test,
            Arc::new(StorageConfig::default()),
            "svc",
            Some(Arc::new(MemoryAuditSink::new())),
            Some(data),
        )
        .unwrap();

        assert_eq!(client.backend_type(), StorageBackend::Memory);
        let info = client.get_info("images/b.png").await.unwrap();
        assert_eq!(info.size, 20);
        assert_eq!(info.etag.as_deref(), Some("test-etag-1"));
    }

    #[test]
    fn test_audit_only_when_enabled() {
        let config = StorageConfig {
            enable_audit: false,
            ..Default::default()
        };
        let client = create_client_from_config(
            Arc::new(config),
            "svc",
            true,
            Some(Arc::new(MemoryAuditSink::new())),
        )
        .unwrap();
        assert!(!client.is_audit_enabled());
        assert_eq!(client.service(), "svc");
    }

    #[test]
    fn test_development_url_uses_bucket() {
        let config = StorageConfig {
            base_url: "http://localhost:9000/".to_string(),
            bucket_name: "media".to_string(),
            ..Default::default()
        };
        let backend = create_backend(ClientKind::Development, &config, None).unwrap();
        assert_eq!(backend.get_url("a.png"), "http://localhost:9000/media/a.png");
    }
}
