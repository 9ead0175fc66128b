//! Auditable storage client
//!
//! [`AuditedStorage`] wraps any [`Storage`] backend. Every audited call runs
//! the same steps:
//!
//! 1. validate the request (uploads only) against the client configuration;
//! 2. time the backend call, and nothing else;
//! 3. emit exactly one audit event for the outcome, plus an `operation_slow`
//!    performance event when the call exceeded its threshold;
//! 4. return the backend result unchanged, or a [`ClientError`] carrying a
//!    stable code with the backend error as its source.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use stowage_core::constants::{
    HEALTH_CHECK_PREFIX, SNAPSHOT_PREFIX, SNAPSHOT_UPLOAD_SOURCE, SYSTEM_ACTOR,
};
use stowage_core::units::throughput_mbps;
use stowage_core::validation::is_valid_filename;
use stowage_core::{
    ByteSource, ErrorCode, FileInfo, StorageConfig, UploadRequest, UploadResponse,
    ValidationError,
};
use stowage_infra::audit::{
    AuditEventType, AuditLogger, FileOperationMetadata, PerformanceEventMetadata,
    StorageErrorMetadata,
};
use stowage_infra::{RetryError, RetryExecutor};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::actor::{current_actor, resolve_actor};
use crate::error::{ClientError, ClientResult};
use crate::keys::generate_file_path;
use crate::traits::{Closeable, HealthProbe, Storage, StorageError, StorageResult};
use crate::StorageBackend;

/// Audited operations on top of the raw [`Storage`] surface.
#[async_trait]
pub trait AuditableStorage: Storage {
    async fn upload_with_audit(
        &self,
        request: UploadRequest,
        actor: &str,
    ) -> ClientResult<UploadResponse>;

    async fn delete_with_audit(&self, path: &str, actor: &str) -> ClientResult<()>;

    async fn get_info_with_audit(&self, path: &str, actor: &str) -> ClientResult<FileInfo>;
}

/// Storage decorator adding validation, audit events and slow-operation
/// detection.
pub struct AuditedStorage {
    inner: Arc<dyn Storage>,
    audit: AuditLogger,
    config: Arc<StorageConfig>,
    service: String,
    executor: Option<Arc<RetryExecutor>>,
}

impl AuditedStorage {
    pub fn new(
        inner: Arc<dyn Storage>,
        audit: AuditLogger,
        config: Arc<StorageConfig>,
        service: impl Into<String>,
    ) -> Self {
        Self {
            inner,
            audit,
            config,
            service: service.into(),
            executor: None,
        }
    }

    /// Route [`delete_with_retry`](Self::delete_with_retry) through `executor`.
    pub fn with_executor(mut self, executor: RetryExecutor) -> Self {
        self.executor = Some(Arc::new(executor));
        self
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn is_audit_enabled(&self) -> bool {
        self.audit.is_enabled()
    }

    pub fn audit(&self) -> &AuditLogger {
        &self.audit
    }

    pub fn inner(&self) -> &Arc<dyn Storage> {
        &self.inner
    }

    /// Size, then content type, then filename.
    fn validate_upload(&self, request: &UploadRequest) -> Result<(), ValidationError> {
        if request.file_size > self.config.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size: request.file_size,
                max: self.config.max_file_size,
            });
        }

        if !self.config.is_allowed_type(&request.content_type) {
            return Err(ValidationError::ContentTypeNotAllowed(
                request.content_type.clone(),
            ));
        }

        if !is_valid_filename(&request.filename) {
            return Err(ValidationError::InvalidFilename(request.filename.clone()));
        }

        Ok(())
    }

    fn file_metadata(&self, path: &str) -> FileOperationMetadata {
        FileOperationMetadata::for_path(path, self.config.bucket_name.clone())
    }

    fn record_failure(
        &self,
        actor: &str,
        operation: &str,
        code: ErrorCode,
        message: String,
        elapsed: Duration,
        context: Map<String, Value>,
    ) {
        self.audit.log_storage_error(
            actor,
            &StorageErrorMetadata {
                operation: operation.to_string(),
                error_code: code.as_str().to_string(),
                error_message: message,
                retry_count: 0,
                duration_ms: elapsed.as_millis() as u64,
                context,
            },
        );
    }

    fn path_context(&self, path: &str) -> Map<String, Value> {
        let mut context = Map::new();
        context.insert("file_path".to_string(), Value::from(path));
        context.insert(
            "bucket_name".to_string(),
            Value::from(self.config.bucket_name.clone()),
        );
        context
    }

    /// Emits `operation_slow` when `elapsed` is over `threshold`.
    fn check_slow(
        &self,
        actor: &str,
        operation: &str,
        path: &str,
        bytes: u64,
        elapsed: Duration,
        threshold: Duration,
    ) {
        if elapsed <= threshold {
            return;
        }

        tracing::warn!(
            operation = %operation,
            path = %path,
            duration_ms = elapsed.as_millis() as u64,
            threshold_ms = threshold.as_millis() as u64,
            "Slow storage operation"
        );

        let mut additional = Map::new();
        additional.insert("file_path".to_string(), Value::from(path));

        self.audit.log_performance_event(
            actor,
            AuditEventType::OperationSlow,
            &PerformanceEventMetadata {
                operation: operation.to_string(),
                duration_ms: elapsed.as_millis() as u64,
                file_size: bytes,
                throughput_mbps: throughput_mbps(bytes, elapsed),
                threshold_ms: threshold.as_millis() as u64,
                additional,
                ..Default::default()
            },
        );
    }

    fn finish_delete(
        &self,
        actor: &str,
        path: &str,
        result: StorageResult<()>,
        elapsed: Duration,
    ) -> ClientResult<()> {
        match result {
            Ok(()) => {
                let mut metadata = self.file_metadata(path);
                metadata.duration_ms = Some(elapsed.as_millis() as u64);
                self.audit.log_file_delete(actor, &metadata, None);
                self.check_slow(actor, "delete", path, 0, elapsed, self.config.timeout / 2);

                tracing::info!(
                    path = %path,
                    actor = %actor,
                    duration_ms = elapsed.as_secs_f64() * 1000.0,
                    "File deleted"
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, path = %path, actor = %actor, "File delete failed");
                self.record_failure(
                    actor,
                    "delete",
                    ErrorCode::DeleteFailed,
                    e.to_string(),
                    elapsed,
                    self.path_context(path),
                );
                Err(ClientError::operation(ErrorCode::DeleteFailed, e))
            }
        }
    }

    /// Delete through the configured executor, retrying backend failures
    /// before the outcome is audited. An exhausted budget is returned as
    /// [`ClientError::RetriesExhausted`] with the attempts made. Without an
    /// executor this is [`delete_with_audit`](AuditableStorage::delete_with_audit).
    pub async fn delete_with_retry(
        &self,
        path: &str,
        actor: &str,
        token: &CancellationToken,
    ) -> ClientResult<()> {
        let Some(executor) = &self.executor else {
            return self.delete_with_audit(path, actor).await;
        };
        let actor = resolve_actor(Some(actor));

        let start = Instant::now();
        let outcome = executor.execute(|| self.inner.delete(path), token).await;
        let elapsed = start.elapsed();
        let attempts = outcome.attempts_used;

        tracing::debug!(
            path = %path,
            attempts_used = attempts,
            total_delay_ms = outcome.total_delay.as_millis() as u64,
            "Delete retry finished"
        );

        match outcome.result {
            Ok(()) => self.finish_delete(&actor, path, Ok(()), elapsed),
            Err(RetryError::Operation(e)) => {
                match self.finish_delete(&actor, path, Err(e), elapsed) {
                    Err(ClientError::Operation { code, source }) => {
                        Err(ClientError::RetriesExhausted {
                            code,
                            attempts,
                            source,
                        })
                    }
                    other => other,
                }
            }
            Err(RetryError::Cancelled(reason)) => {
                tracing::warn!(
                    path = %path,
                    attempts_used = attempts,
                    reason = %reason,
                    "File delete cancelled"
                );
                self.record_failure(
                    &actor,
                    "delete",
                    ErrorCode::OperationCancelled,
                    reason.to_string(),
                    elapsed,
                    self.path_context(path),
                );
                Err(ClientError::Cancelled {
                    operation: ErrorCode::DeleteFailed,
                    reason,
                    attempts,
                })
            }
        }
    }

    /// Upload to `snapshots/YYYY/MM/DD/<name>_<unix><ext>` and return the
    /// generated path.
    pub async fn upload_snapshot(
        &self,
        source: ByteSource,
        filename: &str,
        content_type: &str,
        size: u64,
        actor: &str,
    ) -> ClientResult<String> {
        let path = generate_file_path(filename, SNAPSHOT_PREFIX);
        let request = UploadRequest::new(source, filename, content_type, size, path)
            .with_metadata("original_filename", filename)
            .with_metadata("upload_source", SNAPSHOT_UPLOAD_SOURCE);

        let response = self.upload_with_audit(request, actor).await?;
        Ok(response.path)
    }

    pub async fn delete_snapshot(&self, path: &str, actor: &str) -> ClientResult<()> {
        self.delete_with_audit(path, actor).await
    }

    pub fn snapshot_url(&self, path: &str) -> String {
        self.inner.get_url(path)
    }

    /// Backend health.
    ///
    /// Uses the backend's own probe when it has one. Otherwise looks up a
    /// `health-check-YYYYMMDD` object that normally does not exist; only a
    /// transport failure counts as unhealthy.
    pub async fn health_check(&self) -> ClientResult<()> {
        let result = match self.inner.health_probe() {
            Some(probe) => probe.check_health().await,
            None => {
                let key = format!("{}{}", HEALTH_CHECK_PREFIX, Utc::now().format("%Y%m%d"));
                match self.inner.get_info(&key).await {
                    Err(e) if e.is_transport() => Err(e),
                    _ => Ok(()),
                }
            }
        };

        result.map_err(|e| {
            tracing::warn!(error = %e, service = %self.service, "Storage health check failed");
            ClientError::operation(ErrorCode::HealthCheckFailed, e)
        })
    }

    /// Record the shutdown, then close the backend if it supports it.
    pub async fn close(&self) -> ClientResult<()> {
        if self.audit.is_enabled() {
            let mut new_config = Map::new();
            new_config.insert("action".to_string(), Value::from("client_shutdown"));
            new_config.insert("service".to_string(), Value::from(self.service.clone()));
            self.audit
                .log_config_change(SYSTEM_ACTOR, Map::new(), new_config);
        }

        if let Some(closer) = self.inner.closer() {
            closer
                .close()
                .await
                .map_err(|e| ClientError::operation(ErrorCode::CloseFailed, e))?;
        }

        tracing::info!(service = %self.service, "Storage client closed");
        Ok(())
    }
}

#[async_trait]
impl AuditableStorage for AuditedStorage {
    async fn upload_with_audit(
        &self,
        request: UploadRequest,
        actor: &str,
    ) -> ClientResult<UploadResponse> {
        let actor = resolve_actor(Some(actor));

        let mut metadata = self.file_metadata(&request.bucket_path);
        metadata.filename = request.filename.clone();
        metadata.file_size = request.file_size;
        metadata.content_type = request.content_type.clone();
        metadata.additional = request.metadata.clone();

        if let Err(e) = self.validate_upload(&request) {
            tracing::debug!(
                error = %e,
                filename = %request.filename,
                actor = %actor,
                "Upload rejected by validation"
            );
            let mut context = self.path_context(&request.bucket_path);
            context.insert("file_name".to_string(), Value::from(request.filename.clone()));
            context.insert("file_size".to_string(), Value::from(request.file_size));
            context.insert(
                "content_type".to_string(),
                Value::from(request.content_type.clone()),
            );
            self.record_failure(
                &actor,
                "upload",
                ErrorCode::ValidationError,
                e.to_string(),
                Duration::ZERO,
                context,
            );
            return Err(e.into());
        }

        let path = request.bucket_path.clone();
        let start = Instant::now();
        let result = self.inner.upload(request).await;
        let elapsed = start.elapsed();

        match result {
            Ok(response) => {
                metadata.file_size = response.size;
                metadata.etag = response.etag.clone();
                metadata.upload_time = Some(response.last_modified.to_rfc3339());
                metadata.duration_ms = Some(elapsed.as_millis() as u64);
                metadata.throughput_mbps = Some(throughput_mbps(response.size, elapsed));
                self.audit.log_file_upload(&actor, &metadata, None);
                self.check_slow(
                    &actor,
                    "upload",
                    &path,
                    response.size,
                    elapsed,
                    self.config.timeout,
                );

                tracing::info!(
                    path = %path,
                    actor = %actor,
                    size_bytes = response.size,
                    duration_ms = elapsed.as_secs_f64() * 1000.0,
                    "File uploaded"
                );
                Ok(response)
            }
            Err(e) => {
                tracing::error!(error = %e, path = %path, actor = %actor, "File upload failed");
                let mut context = self.path_context(&path);
                context.insert("file_name".to_string(), Value::from(metadata.filename));
                self.record_failure(
                    &actor,
                    "upload",
                    ErrorCode::UploadFailed,
                    e.to_string(),
                    elapsed,
                    context,
                );
                Err(ClientError::operation(ErrorCode::UploadFailed, e))
            }
        }
    }

    async fn delete_with_audit(&self, path: &str, actor: &str) -> ClientResult<()> {
        let actor = resolve_actor(Some(actor));
        let start = Instant::now();
        let result = self.inner.delete(path).await;
        let elapsed = start.elapsed();
        self.finish_delete(&actor, path, result, elapsed)
    }

    async fn get_info_with_audit(&self, path: &str, actor: &str) -> ClientResult<FileInfo> {
        let actor = resolve_actor(Some(actor));
        let start = Instant::now();
        let result = self.inner.get_info(path).await;
        let elapsed = start.elapsed();

        match result {
            Ok(info) => {
                let mut metadata = self.file_metadata(path);
                metadata.file_size = info.size;
                metadata.content_type = info.content_type.clone();
                metadata.etag = info.etag.clone();
                metadata.access_time = Some(Utc::now().to_rfc3339());
                metadata.duration_ms = Some(elapsed.as_millis() as u64);
                metadata.throughput_mbps = Some(throughput_mbps(info.size, elapsed));
                self.audit.log_file_access(&actor, &metadata, None);
                self.check_slow(
                    &actor,
                    "get_info",
                    path,
                    info.size,
                    elapsed,
                    self.config.timeout / 4,
                );
                Ok(info)
            }
            Err(e) => {
                tracing::debug!(error = %e, path = %path, actor = %actor, "File info lookup failed");
                self.record_failure(
                    &actor,
                    "get_info",
                    ErrorCode::GetInfoFailed,
                    e.to_string(),
                    elapsed,
                    self.path_context(path),
                );
                Err(ClientError::operation(ErrorCode::GetInfoFailed, e))
            }
        }
    }
}

/// Raw pass-through, except `get_info`, which is audited under the ambient
/// actor.
#[async_trait]
impl Storage for AuditedStorage {
    async fn upload(&self, request: UploadRequest) -> StorageResult<UploadResponse> {
        self.inner.upload(request).await
    }

    async fn delete(&self, path: &str) -> StorageResult<()> {
        self.inner.delete(path).await
    }

    async fn get_info(&self, path: &str) -> StorageResult<FileInfo> {
        self.get_info_with_audit(path, &current_actor())
            .await
            .map_err(|e| match e {
                ClientError::Operation { source, .. } => source,
                other => StorageError::Backend(other.to_string()),
            })
    }

    fn get_url(&self, path: &str) -> String {
        self.inner.get_url(path)
    }

    fn backend_type(&self) -> StorageBackend {
        self.inner.backend_type()
    }

    fn health_probe(&self) -> Option<&dyn HealthProbe> {
        self.inner.health_probe()
    }

    fn closer(&self) -> Option<&dyn Closeable> {
        self.inner.closer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStorage;
    use stowage_infra::audit::{AuditSink, MemoryAuditSink};

    fn client(storage: MemoryStorage) -> (AuditedStorage, Arc<MemoryAuditSink>) {
        let sink = Arc::new(MemoryAuditSink::new());
        let audit = AuditLogger::new(
            "test-service",
            Some(sink.clone() as Arc<dyn AuditSink>),
            Map::new(),
        );
        let client = AuditedStorage::new(
            Arc::new(storage),
            audit,
            Arc::new(StorageConfig::default()),
            "test-service",
        );
        (client, sink)
    }

    #[tokio::test]
    async fn test_validation_order() {
        let (client, _) = client(MemoryStorage::new());
        let max = client.config().max_file_size;

        let too_large = UploadRequest::from_bytes(Vec::<u8>::new(), "a.pdf", "application/pdf", "a.pdf");
        let too_large = UploadRequest {
            file_size: max + 1,
            ..too_large
        };
        assert!(matches!(
            client.validate_upload(&too_large),
            Err(ValidationError::FileTooLarge { .. })
        ));

        let wrong_type = UploadRequest::from_bytes(vec![1u8], "../a.pdf", "application/pdf", "a");
        assert!(matches!(
            client.validate_upload(&wrong_type),
            Err(ValidationError::ContentTypeNotAllowed(_))
        ));

        let bad_name = UploadRequest::from_bytes(vec![1u8], "../a.png", "image/png", "a");
        assert!(matches!(
            client.validate_upload(&bad_name),
            Err(ValidationError::InvalidFilename(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_actor_becomes_system() {
        let (client, sink) = client(MemoryStorage::new());
        client
            .upload_with_audit(
                UploadRequest::from_bytes(vec![0u8; 8], "a.png", "image/png", "images/a.png"),
                "",
            )
            .await
            .unwrap();

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].actor_id, "system");
        assert_eq!(events[0].metadata_value("file_size"), Some(&Value::from(8)));
    }

    #[tokio::test]
    async fn test_storage_get_info_uses_ambient_actor() {
        let storage = MemoryStorage::builder()
            .with_file("images/a.png", 4, "image/png")
            .build();
        let (client, sink) = client(storage);

        crate::actor::with_actor("carol", async {
            client.get_info("images/a.png").await.unwrap();
        })
        .await;
        let missing = client.get_info("images/missing.png").await;

        assert_eq!(
            missing,
            Err(StorageError::NotFound("images/missing.png".to_string()))
        );
        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, AuditEventType::FileAccessed);
        assert_eq!(events[0].actor_id, "carol");
        assert_eq!(events[1].event_type, AuditEventType::StorageError);
        assert_eq!(events[1].metadata_str("error_code"), Some("GET_INFO_FAILED"));
    }

    #[tokio::test]
    async fn test_raw_upload_is_not_audited() {
        let (client, sink) = client(MemoryStorage::new());
        client
            .upload(UploadRequest::from_bytes(
                vec![1u8, 2],
                "a.png",
                "image/png",
                "a.png",
            ))
            .await
            .unwrap();
        client.delete("a.png").await.unwrap();
        assert!(sink.is_empty());
        assert_eq!(client.backend_type(), StorageBackend::Memory);
        assert_eq!(client.get_url("a.png"), "http://mock-storage.local/a.png");
    }
}
