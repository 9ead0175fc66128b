//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement,
//! plus the optional capabilities a backend may expose.

use crate::StorageBackend;
use async_trait::async_trait;
use stowage_core::{FileInfo, UploadRequest, UploadResponse};
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("File not found: {0}")]
    NotFound(String),

    /// The backend could not be reached or the connection failed mid-request.
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Failed to read upload source: {0}")]
    Read(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage client is closed")]
    Closed,
}

impl StorageError {
    /// Whether the failure is a connectivity problem worth retrying.
    pub fn is_transport(&self) -> bool {
        matches!(self, StorageError::Transport(_))
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Read(e.to_string())
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage abstraction trait
///
/// All storage backends (S3, in-memory) implement this trait. Callers never
/// depend on a concrete backend; optional features are discovered through
/// [`health_probe`](Storage::health_probe) and [`closer`](Storage::closer).
#[async_trait]
pub trait Storage: Send + Sync {
    /// Store the request's bytes at `request.bucket_path`.
    ///
    /// The returned `path` always equals `bucket_path`.
    async fn upload(&self, request: UploadRequest) -> StorageResult<UploadResponse>;

    /// Delete an object. Deleting a missing object succeeds.
    async fn delete(&self, path: &str) -> StorageResult<()>;

    /// Look up an object's metadata.
    async fn get_info(&self, path: &str) -> StorageResult<FileInfo>;

    /// Public URL of an object. Pure; no request is made.
    fn get_url(&self, path: &str) -> String;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;

    /// Dedicated health check, if the backend has one.
    fn health_probe(&self) -> Option<&dyn HealthProbe> {
        None
    }

    /// Shutdown hook, if the backend holds resources.
    fn closer(&self) -> Option<&dyn Closeable> {
        None
    }
}

/// Backend-specific health check.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn check_health(&self) -> StorageResult<()>;
}

/// Backend-specific shutdown.
#[async_trait]
pub trait Closeable: Send + Sync {
    async fn close(&self) -> StorageResult<()>;
}
