//! Stowage Storage Library
//!
//! This crate provides the storage abstraction, its backends (S3 and
//! in-memory), and the auditable client that wraps any backend.
//!
//! # Storage key format
//!
//! Keys are relative `/`-separated paths inside the configured bucket. Keys
//! must not be empty, contain `..`, or start with `/`; every backend checks
//! them with the same rules from the `keys` module. Generated keys are
//! date-partitioned: `{prefix}/{YYYY}/{MM}/{DD}/{name}_{unix}{ext}`.

pub mod actor;
pub mod audited;
pub mod error;
pub mod factory;
pub mod keys;
pub mod memory;
#[cfg(feature = "storage-s3")]
pub mod s3;
mod source;
pub mod traits;

// Re-export commonly used types
pub use audited::{AuditableStorage, AuditedStorage};
pub use error::{ClientError, ClientResult};
pub use factory::{
    create_client, create_client_from_config, create_client_from_environment, ClientKind,
    TestData,
};
pub use memory::{MemoryStorage, MemoryStorageBuilder};
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use stowage_core::StorageBackend;
pub use traits::{Closeable, HealthProbe, Storage, StorageError, StorageResult};
