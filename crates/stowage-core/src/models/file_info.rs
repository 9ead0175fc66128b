use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata about a stored object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    pub path: String,
    pub size: u64,
    pub content_type: String,
    pub etag: Option<String>,
    pub last_modified: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}
