//! Shared key handling for storage backends.
//!
//! Keys are relative, `/`-separated paths inside the bucket. They must not be
//! empty, start with `/`, or contain `..`.

use chrono::{DateTime, Utc};
use stowage_core::validation::split_extension;

use crate::traits::{StorageError, StorageResult};

/// Reject keys that could escape the bucket namespace.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }
    if key.contains("..") || key.starts_with('/') {
        return Err(StorageError::InvalidKey(format!(
            "Storage key contains invalid characters: {}",
            key
        )));
    }
    Ok(())
}

/// `{prefix}/{YYYY}/{MM}/{DD}/{name}_{unix}{ext}` for the given instant.
pub fn generate_file_path_at(filename: &str, prefix: &str, now: DateTime<Utc>) -> String {
    let (name, ext) = split_extension(filename);
    format!(
        "{}/{}/{}_{}{}",
        prefix.trim_end_matches('/'),
        now.format("%Y/%m/%d"),
        name,
        now.timestamp(),
        ext
    )
}

/// Date-partitioned, timestamped key for a new file.
pub fn generate_file_path(filename: &str, prefix: &str) -> String {
    generate_file_path_at(filename, prefix, Utc::now())
}

/// Append the current unix time to a key, before its extension.
pub fn generate_unique_filename(base_path: &str) -> String {
    let (name, ext) = split_extension(base_path);
    format!("{}_{}{}", name, Utc::now().timestamp(), ext)
}
