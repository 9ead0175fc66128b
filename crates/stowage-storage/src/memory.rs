//! In-memory storage backend
//!
//! Used for development and tests. All state lives behind one
//! `tokio::sync::RwLock`: mutations take the write lock, queries the read lock.
//! Failures can be injected for the next call (or the next `n` calls).

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use serde_json::Map;
use stowage_core::checksum::sha256_hex;
use stowage_core::{FileInfo, UploadRequest, UploadResponse};
use tokio::sync::RwLock;

use crate::keys::validate_key;
use crate::source::read_source;
use crate::traits::{Closeable, HealthProbe, Storage, StorageError, StorageResult};
use crate::StorageBackend;

const DEFAULT_BASE_URL: &str = "http://mock-storage.local";

#[derive(Debug, Clone)]
struct StoredFile {
    info: FileInfo,
    data: Bytes,
}

#[derive(Debug, Default)]
struct MemoryState {
    files: HashMap<String, StoredFile>,
    uploads: Vec<UploadResponse>,
    deletes: Vec<String>,
    failure: Option<ArmedFailure>,
    closed: bool,
}

#[derive(Debug)]
struct ArmedFailure {
    error: StorageError,
    remaining: u32,
}

impl MemoryState {
    /// Consume one armed failure, or report a closed store.
    fn take_failure(&mut self) -> StorageResult<()> {
        if self.closed {
            return Err(StorageError::Closed);
        }

        let Some(armed) = self.failure.as_mut() else {
            return Ok(());
        };

        let error = armed.error.clone();
        armed.remaining = armed.remaining.saturating_sub(1);
        if armed.remaining == 0 {
            self.failure = None;
        }
        Err(error)
    }
}

/// Storage backend that keeps objects in process memory.
#[derive(Debug)]
pub struct MemoryStorage {
    state: RwLock<MemoryState>,
    latency: Option<Duration>,
    base_url: String,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
            latency: None,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn builder() -> MemoryStorageBuilder {
        MemoryStorageBuilder::default()
    }

    /// Fail the next operation with `error`.
    pub async fn fail_next(&self, error: StorageError) {
        self.fail_times(1, error).await;
    }

    /// Fail the next `times` operations with `error`. Zero disarms.
    pub async fn fail_times(&self, times: u32, error: StorageError) {
        let mut state = self.state.write().await;
        state.failure = (times > 0).then_some(ArmedFailure {
            error,
            remaining: times,
        });
    }

    /// All stored objects, keyed by path.
    pub async fn files(&self) -> HashMap<String, FileInfo> {
        let state = self.state.read().await;
        state
            .files
            .iter()
            .map(|(path, file)| (path.clone(), file.info.clone()))
            .collect()
    }

    /// Every successful upload, in order.
    pub async fn uploads(&self) -> Vec<UploadResponse> {
        self.state.read().await.uploads.clone()
    }

    /// Every successful delete, in order.
    pub async fn deletes(&self) -> Vec<String> {
        self.state.read().await.deletes.clone()
    }

    /// Stored bytes of an object.
    pub async fn file_data(&self, path: &str) -> Option<Bytes> {
        let state = self.state.read().await;
        state.files.get(path).map(|file| file.data.clone())
    }

    /// Objects whose path starts with `prefix`, sorted by path. A `limit` of 0
    /// means no limit.
    pub async fn list_files(&self, prefix: &str, limit: usize) -> StorageResult<Vec<FileInfo>> {
        self.simulate_latency().await;
        let mut state = self.state.write().await;
        state.take_failure()?;

        let mut files: Vec<FileInfo> = state
            .files
            .values()
            .filter(|file| file.info.path.starts_with(prefix))
            .map(|file| file.info.clone())
            .collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        if limit > 0 {
            files.truncate(limit);
        }
        Ok(files)
    }

    /// Copy an object to a new path, giving the copy a fresh timestamp.
    pub async fn copy_file(&self, source: &str, destination: &str) -> StorageResult<()> {
        validate_key(destination)?;
        self.simulate_latency().await;
        let mut state = self.state.write().await;
        state.take_failure()?;

        let mut copy = state
            .files
            .get(source)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(source.to_string()))?;
        copy.info.path = destination.to_string();
        copy.info.last_modified = Utc::now();
        state.files.insert(destination.to_string(), copy);

        tracing::debug!(source = %source, destination = %destination, "Memory copy successful");
        Ok(())
    }

    /// Drop all objects, history and armed failures, and reopen the store.
    pub async fn reset(&self) {
        *self.state.write().await = MemoryState::default();
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn upload(&self, request: UploadRequest) -> StorageResult<UploadResponse> {
        validate_key(&request.bucket_path)?;
        self.simulate_latency().await;
        self.state.write().await.take_failure()?;

        let UploadRequest {
            mut reader,
            content_type,
            bucket_path,
            metadata,
            file_size,
            ..
        } = request;

        let data = read_source(&mut reader, file_size).await?;

        let data = Bytes::from(data);
        let etag = sha256_hex(&data);
        let now = Utc::now();

        let info = FileInfo {
            path: bucket_path.clone(),
            size: data.len() as u64,
            content_type: content_type.clone(),
            etag: Some(etag.clone()),
            last_modified: now,
            metadata: metadata.clone(),
        };
        let response = UploadResponse {
            path: bucket_path.clone(),
            url: self.get_url(&bucket_path),
            size: info.size,
            content_type,
            etag: Some(etag),
            last_modified: now,
            metadata,
        };

        let mut state = self.state.write().await;
        state
            .files
            .insert(bucket_path.clone(), StoredFile { info, data });
        state.uploads.push(response.clone());

        tracing::debug!(key = %bucket_path, size_bytes = response.size, "Memory upload successful");
        Ok(response)
    }

    async fn delete(&self, path: &str) -> StorageResult<()> {
        validate_key(path)?;
        self.simulate_latency().await;
        let mut state = self.state.write().await;
        state.take_failure()?;

        state.files.remove(path);
        state.deletes.push(path.to_string());

        tracing::debug!(key = %path, "Memory delete successful");
        Ok(())
    }

    async fn get_info(&self, path: &str) -> StorageResult<FileInfo> {
        validate_key(path)?;
        self.simulate_latency().await;
        let mut state = self.state.write().await;
        state.take_failure()?;

        state
            .files
            .get(path)
            .map(|file| file.info.clone())
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    fn get_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }

    fn health_probe(&self) -> Option<&dyn HealthProbe> {
        Some(self)
    }

    fn closer(&self) -> Option<&dyn Closeable> {
        Some(self)
    }
}

#[async_trait]
impl HealthProbe for MemoryStorage {
    async fn check_health(&self) -> StorageResult<()> {
        self.state.write().await.take_failure()
    }
}

#[async_trait]
impl Closeable for MemoryStorage {
    /// Clears all state; later operations fail with [`StorageError::Closed`]
    /// until [`MemoryStorage::reset`] is called.
    async fn close(&self) -> StorageResult<()> {
        let mut state = self.state.write().await;
        *state = MemoryState::default();
        state.closed = true;
        tracing::debug!("Memory storage closed");
        Ok(())
    }
}

/// Builder for a [`MemoryStorage`] with pre-seeded objects.
#[derive(Debug, Default)]
pub struct MemoryStorageBuilder {
    files: Vec<FileInfo>,
    failure: Option<StorageError>,
    latency: Option<Duration>,
    base_url: Option<String>,
}

impl MemoryStorageBuilder {
    /// Seed an object with the given metadata and no content.
    pub fn with_file(mut self, path: &str, size: u64, content_type: &str) -> Self {
        let etag = format!("test-etag-{}", self.files.len());
        self.files.push(FileInfo {
            path: path.to_string(),
            size,
            content_type: content_type.to_string(),
            etag: Some(etag),
            last_modified: Utc::now(),
            metadata: Map::new(),
        });
        self
    }

    pub fn with_file_info(mut self, info: FileInfo) -> Self {
        self.files.push(info);
        self
    }

    /// Fail the first operation.
    pub fn with_failure(mut self, error: StorageError) -> Self {
        self.failure = Some(error);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn build(self) -> MemoryStorage {
        let files = self
            .files
            .into_iter()
            .map(|info| {
                (
                    info.path.clone(),
                    StoredFile {
                        info,
                        data: Bytes::new(),
                    },
                )
            })
            .collect();

        let state = MemoryState {
            files,
            failure: self.failure.map(|error| ArmedFailure {
                error,
                remaining: 1,
            }),
            ..Default::default()
        };

        MemoryStorage {
            state: RwLock::new(state),
            latency: self.latency,
            base_url: self
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(path: &str, data: &[u8]) -> UploadRequest {
        UploadRequest::from_bytes(data.to_vec(), "file.txt", "text/plain", path)
    }

    #[tokio::test]
    async fn test_memory_storage_upload_and_info() {
        let storage = MemoryStorage::new();

        let response = storage
            .upload(request("docs/file.txt", b"test data").with_metadata("owner", "alice"))
            .await
            .unwrap();

        assert_eq!(response.path, "docs/file.txt");
        assert_eq!(response.size, 9);
        assert_eq!(response.url, "http://mock-storage.local/docs/file.txt");
        assert_eq!(response.etag.as_deref(), Some(sha256_hex(b"test data").as_str()));

        let info = storage.get_info("docs/file.txt").await.unwrap();
        assert_eq!(info.size, 9);
        assert_eq!(info.content_type, "text/plain");
        assert_eq!(info.metadata.get("owner").and_then(|v| v.as_str()), Some("alice"));

        assert_eq!(
            storage.file_data("docs/file.txt").await.unwrap(),
            Bytes::from_static(b"test data")
        );
        assert_eq!(storage.uploads().await.len(), 1);
    }

    #[tokio::test]
    async fn test_memory_storage_unknown_size_is_measured() {
        let storage = MemoryStorage::new();
        let mut req = request("a.txt", b"12345");
        req.file_size = 0;

        let response = storage.upload(req).await.unwrap();
        assert_eq!(response.size, 5);
    }

    #[tokio::test]
    async fn test_memory_storage_overstated_size_is_measured() {
        let storage = MemoryStorage::new();
        let mut req = request("a.txt", b"abcd");
        req.file_size = u64::MAX;

        let response = storage.upload(req).await.unwrap();
        assert_eq!(response.size, 4);
        assert_eq!(storage.get_info("a.txt").await.unwrap().size, 4);
    }

    #[tokio::test]
    async fn test_memory_storage_get_info_missing() {
        let storage = MemoryStorage::new();
        let result = storage.get_info("missing.txt").await;
        assert_eq!(result, Err(StorageError::NotFound("missing.txt".to_string())));
    }

    #[tokio::test]
    async fn test_memory_storage_delete_nonexistent() {
        let storage = MemoryStorage::new();
        assert!(storage.delete("nonexistent/file.txt").await.is_ok());
        assert_eq!(storage.deletes().await, vec!["nonexistent/file.txt".to_string()]);
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let storage = MemoryStorage::new();
        assert!(matches!(
            storage.get_info("../etc/passwd").await,
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            storage.delete("/etc/passwd").await,
            Err(StorageError::InvalidKey(_))
        ));
        assert!(storage.deletes().await.is_empty());
    }

    #[tokio::test]
    async fn test_fail_next_is_one_shot() {
        let storage = MemoryStorage::new();
        storage
            .fail_next(StorageError::Transport("connection reset".to_string()))
            .await;

        assert_eq!(
            storage.delete("a.txt").await,
            Err(StorageError::Transport("connection reset".to_string()))
        );
        assert!(storage.delete("a.txt").await.is_ok());
    }

    #[tokio::test]
    async fn test_fail_times() {
        let storage = MemoryStorage::new();
        storage
            .fail_times(2, StorageError::Backend("503".to_string()))
            .await;

        assert!(storage.get_info("a.txt").await.is_err());
        assert!(storage.delete("a.txt").await.is_err());
        assert!(storage.delete("a.txt").await.is_ok());
    }

    #[tokio::test]
    async fn test_list_and_copy() {
        let storage = MemoryStorage::builder()
            .with_file("images/b.png", 20, "image/png")
            .with_file("images/a.png", 10, "image/png")
            .with_file("docs/c.pdf", 30, "application/pdf")
            .build();

        let images = storage.list_files("images/", 0).await.unwrap();
        let paths: Vec<_> = images.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["images/a.png", "images/b.png"]);
        assert_eq!(storage.list_files("", 2).await.unwrap().len(), 2);

        storage
            .copy_file("images/a.png", "backup/a.png")
            .await
            .unwrap();
        let copy = storage.get_info("backup/a.png").await.unwrap();
        assert_eq!(copy.size, 10);
        assert_eq!(copy.path, "backup/a.png");

        assert!(matches!(
            storage.copy_file("missing.png", "x.png").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_builder_failure_and_latency() {
        let storage = MemoryStorage::builder()
            .with_failure(StorageError::Transport("down".to_string()))
            .with_latency(Duration::from_millis(1))
            .with_base_url("http://cdn.example.com/")
            .build();

        assert!(storage.health_probe().is_some());
        let probe = storage.health_probe().unwrap();
        assert!(probe.check_health().await.is_err());
        assert!(probe.check_health().await.is_ok());
        assert_eq!(storage.get_url("a.png"), "http://cdn.example.com/a.png");
    }

    #[tokio::test]
    async fn test_close_resets_and_rejects() {
        let storage = MemoryStorage::builder()
            .with_file("a.png", 1, "image/png")
            .build();

        storage.closer().unwrap().close().await.unwrap();
        assert!(storage.files().await.is_empty());
        assert_eq!(storage.get_info("a.png").await, Err(StorageError::Closed));

        storage.reset().await;
        assert!(storage.delete("a.png").await.is_ok());
    }
}
