//! Stowage Core Library
//!
//! This crate provides configuration, the retry policy, error types and codes,
//! request/response models, and validation helpers shared by all Stowage crates.

pub mod checksum;
pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod retry_policy;
pub mod storage_types;
pub mod units;
pub mod validation;

// Re-export commonly used types
pub use config::StorageConfig;
pub use error::{ErrorCode, ErrorMetadata, LogLevel, ValidationError};
pub use models::{ByteSource, FileInfo, UploadRequest, UploadResponse};
pub use retry_policy::{RetryPolicy, RetryPolicyBuilder};
pub use storage_types::StorageBackend;
// Note: Storage, StorageError and the backends live in stowage-storage
