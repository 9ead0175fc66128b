use std::fmt;
use std::io::Cursor;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::io::AsyncRead;

/// Byte source consumed by an upload.
pub type ByteSource = Pin<Box<dyn AsyncRead + Send + Unpin>>;

/// A single upload. The byte source is consumed by the backend, so a request
/// can be sent at most once.
pub struct UploadRequest {
    pub reader: ByteSource,
    pub filename: String,
    pub content_type: String,
    /// Declared size in bytes. 0 means unknown; the backend then buffers the
    /// source to learn the size.
    pub file_size: u64,
    /// Destination key inside the bucket.
    pub bucket_path: String,
    pub metadata: Map<String, Value>,
}

impl UploadRequest {
    pub fn new(
        reader: ByteSource,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        file_size: u64,
        bucket_path: impl Into<String>,
    ) -> Self {
        Self {
            reader,
            filename: filename.into(),
            content_type: content_type.into(),
            file_size,
            bucket_path: bucket_path.into(),
            metadata: Map::new(),
        }
    }

    /// Build a request over an in-memory buffer; the declared size is the
    /// buffer length.
    pub fn from_bytes(
        data: impl Into<Vec<u8>>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        bucket_path: impl Into<String>,
    ) -> Self {
        let data = data.into();
        let size = data.len() as u64;
        Self::new(
            Box::pin(Cursor::new(data)),
            filename,
            content_type,
            size,
            bucket_path,
        )
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

impl fmt::Debug for UploadRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadRequest")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("file_size", &self.file_size)
            .field("bucket_path", &self.bucket_path)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

/// Result of a successful upload. `path` always equals the request's
/// `bucket_path`; backends never rename.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub path: String,
    pub url: String,
    pub size: u64,
    pub content_type: String,
    pub etag: Option<String>,
    pub last_modified: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_from_bytes_sets_size_and_reads_back() {
        let mut request = UploadRequest::from_bytes(
            b"hello".to_vec(),
            "hello.txt",
            "text/plain",
            "docs/hello.txt",
        )
        .with_metadata("owner", "alice");

        assert_eq!(request.file_size, 5);
        assert_eq!(request.metadata.get("owner"), Some(&Value::from("alice")));

        let mut buf = Vec::new();
        request.reader.read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, b"hello");
    }

    #[test]
    fn test_debug_omits_reader() {
        let request = UploadRequest::from_bytes(Vec::new(), "a.png", "image/png", "a.png");
        let debug = format!("{:?}", request);
        assert!(debug.contains("a.png"));
        assert!(!debug.contains("reader"));
    }
}
