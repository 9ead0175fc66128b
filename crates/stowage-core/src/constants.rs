//! Shared constants

/// Actor recorded when no caller identity is available.
pub const SYSTEM_ACTOR: &str = "system";

/// Key prefix used by the snapshot helpers.
pub const SNAPSHOT_PREFIX: &str = "snapshots";

/// Metadata value tagged on snapshot uploads under `upload_source`.
pub const SNAPSHOT_UPLOAD_SOURCE: &str = "snapshot";

/// Prefix of the object probed by the fallback health check.
pub const HEALTH_CHECK_PREFIX: &str = "health-check-";

pub const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
