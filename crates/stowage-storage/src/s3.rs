use crate::keys::validate_key;
use crate::source::read_source;
use crate::traits::{HealthProbe, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{
    Attribute, AttributeValue, Attributes, GetOptions, ObjectStoreExt, PutOptions, PutPayload,
    Result as ObjectResult,
};
use serde_json::{Map, Value};
use stowage_core::{FileInfo, StorageConfig, UploadRequest, UploadResponse};
use stowage_infra::retry::is_retryable_error;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// S3 storage implementation
#[derive(Clone)]
pub struct S3Storage {
    store: AmazonS3,
    bucket: String,
    region: String,
    endpoint_url: Option<String>, // Custom endpoint for S3-compatible providers
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO or RustFS)
    /// * `credentials` - Optional access key / secret key; otherwise taken from the environment
    pub fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
        credentials: Option<(String, String)>,
    ) -> StorageResult<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region.clone())
            .with_bucket_name(bucket.clone());

        if let Some(ref endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http)
                .with_virtual_hosted_style_request(false);
        }

        if let Some((access_key, secret_key)) = credentials {
            builder = builder
                .with_access_key_id(access_key)
                .with_secret_access_key(secret_key);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::Config(e.to_string()))?;

        Ok(S3Storage {
            store,
            bucket,
            region,
            endpoint_url,
        })
    }

    /// Build from client configuration. A `base_url` pointing at AWS itself
    /// uses the regional endpoint; anything else is treated as an
    /// S3-compatible endpoint.
    pub fn from_config(config: &StorageConfig) -> StorageResult<Self> {
        let endpoint_url = if config.base_url.is_empty() || config.base_url.contains("amazonaws.com")
        {
            None
        } else {
            Some(config.base_url.clone())
        };

        let credentials = if config.access_key.is_empty() || config.secret_key.is_empty() {
            None
        } else {
            Some((config.access_key.clone(), config.secret_key.clone()))
        };

        Self::new(
            config.bucket_name.clone(),
            config.region.clone(),
            endpoint_url,
            credentials,
        )
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Generate public URL for S3 object
    ///
    /// For AWS S3, uses the standard format: https://{bucket}.s3.{region}.amazonaws.com/{key}
    /// For S3-compatible providers, uses path-style: {endpoint}/{bucket}/{key}
    fn generate_url(&self, key: &str) -> String {
        if let Some(ref endpoint) = self.endpoint_url {
            let base_url = endpoint.trim_end_matches('/');
            format!("{}/{}/{}", base_url, self.bucket, key)
        } else {
            format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, key
            )
        }
    }
}

/// Map an object store failure onto the storage error taxonomy.
///
/// Connectivity problems become `Transport`; everything else the service
/// answered with is a `Backend` error.
fn map_store_error(key: &str, e: ObjectStoreError) -> StorageError {
    match e {
        ObjectStoreError::NotFound { .. } => StorageError::NotFound(key.to_string()),
        other if is_retryable_error(&other) => StorageError::Transport(other.to_string()),
        other => StorageError::Backend(other.to_string()),
    }
}

fn to_attributes(content_type: &str, metadata: &Map<String, Value>) -> Attributes {
    let mut attributes = Attributes::new();
    let content_type = if content_type.is_empty() {
        DEFAULT_CONTENT_TYPE
    } else {
        content_type
    };
    attributes.insert(
        Attribute::ContentType,
        AttributeValue::from(content_type.to_string()),
    );

    for (key, value) in metadata {
        let value = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        attributes.insert(
            Attribute::Metadata(key.clone().into()),
            AttributeValue::from(value),
        );
    }
    attributes
}

fn from_attributes(attributes: &Attributes) -> (Option<String>, Map<String, Value>) {
    let mut content_type = None;
    let mut metadata = Map::new();

    for (key, value) in attributes.iter() {
        let value: &str = value.as_ref();
        match key {
            Attribute::ContentType => content_type = Some(value.to_string()),
            Attribute::Metadata(name) => {
                metadata.insert(name.to_string(), Value::String(value.to_string()));
            }
            _ => {}
        }
    }

    (content_type, metadata)
}

#[async_trait]
impl Storage for S3Storage {
    async fn upload(&self, request: UploadRequest) -> StorageResult<UploadResponse> {
        validate_key(&request.bucket_path)?;
        let start = std::time::Instant::now();

        let UploadRequest {
            mut reader,
            content_type,
            file_size,
            bucket_path: key,
            metadata,
            ..
        } = request;

        // Read the source into memory and upload in a single put.
        let buffer = read_source(&mut reader, file_size).await.map_err(|e| {
            StorageError::Read(format!("Failed to read from stream: {}", e))
        })?;

        let size = buffer.len() as u64;
        let location = Path::from(key.clone());
        let options = PutOptions {
            attributes: to_attributes(&content_type, &metadata),
            ..Default::default()
        };

        let result: ObjectResult<_> = object_store::ObjectStore::put_opts(
            &self.store,
            &location,
            PutPayload::from(Bytes::from(buffer)),
            options,
        )
        .await;

        let put = result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 upload failed"
            );
            map_store_error(&key, e)
        })?;

        let url = self.generate_url(&key);

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(UploadResponse {
            path: key,
            url,
            size,
            content_type,
            etag: put.e_tag,
            last_modified: Utc::now(),
            metadata,
        })
    }

    async fn delete(&self, path: &str) -> StorageResult<()> {
        validate_key(path)?;
        let start = std::time::Instant::now();
        let location = Path::from(path.to_string());

        let result: ObjectResult<_> = self.store.delete(&location).await;

        match result {
            Ok(()) | Err(ObjectStoreError::NotFound { .. }) => {}
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %path,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 delete failed"
                );
                return Err(map_store_error(path, e));
            }
        }

        tracing::info!(
            bucket = %self.bucket,
            key = %path,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(())
    }

    async fn get_info(&self, path: &str) -> StorageResult<FileInfo> {
        validate_key(path)?;
        let location = Path::from(path.to_string());
        let options = GetOptions {
            head: true,
            ..Default::default()
        };

        let result: ObjectResult<_> =
            object_store::ObjectStore::get_opts(&self.store, &location, options).await;

        let result = result.map_err(|e| {
            if !matches!(e, ObjectStoreError::NotFound { .. }) {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %path,
                    "S3 head failed"
                );
            }
            map_store_error(path, e)
        })?;

        let (content_type, metadata) = from_attributes(&result.attributes);

        Ok(FileInfo {
            path: path.to_string(),
            size: result.meta.size,
            content_type: content_type.unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
            etag: result.meta.e_tag.clone(),
            last_modified: result.meta.last_modified,
            metadata,
        })
    }

    fn get_url(&self, path: &str) -> String {
        self.generate_url(path)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }

    fn health_probe(&self) -> Option<&dyn HealthProbe> {
        Some(self)
    }
}

#[async_trait]
impl HealthProbe for S3Storage {
    /// Lists the bucket root; any answer from the service counts as reachable.
    async fn check_health(&self) -> StorageResult<()> {
        let result: ObjectResult<_> =
            object_store::ObjectStore::list_with_delimiter(&self.store, None).await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                tracing::warn!(error = %e, bucket = %self.bucket, "S3 health check failed");
                Err(map_store_error("", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn storage(endpoint: Option<&str>) -> S3Storage {
        S3Storage::new(
            "media".to_string(),
            "eu-west-1".to_string(),
            endpoint.map(String::from),
            Some(("key".to_string(), "secret".to_string())),
        )
        .unwrap()
    }

    #[test]
    fn test_path_style_url_for_custom_endpoint() {
        let storage = storage(Some("http://localhost:9000/"));
        assert_eq!(
            storage.get_url("snapshots/a.png"),
            "http://localhost:9000/media/snapshots/a.png"
        );
        assert_eq!(storage.backend_type(), StorageBackend::S3);
    }

    #[test]
    fn test_aws_url_without_endpoint() {
        let storage = storage(None);
        assert_eq!(
            storage.get_url("a.png"),
            "https://media.s3.eu-west-1.amazonaws.com/a.png"
        );
    }

    #[test]
    fn test_from_config_detects_aws() {
        let config = StorageConfig {
            base_url: "https://s3.eu-west-1.amazonaws.com".to_string(),
            bucket_name: "media".to_string(),
            region: "eu-west-1".to_string(),
            ..Default::default()
        };
        let storage = S3Storage::from_config(&config).unwrap();
        assert_eq!(
            storage.get_url("a.png"),
            "https://media.s3.eu-west-1.amazonaws.com/a.png"
        );
        assert_eq!(storage.bucket(), "media");
    }

    #[test]
    fn test_error_mapping() {
        let not_found = ObjectStoreError::NotFound {
            path: "a.png".to_string(),
            source: Box::new(io::Error::from(io::ErrorKind::NotFound)),
        };
        assert_eq!(
            map_store_error("a.png", not_found),
            StorageError::NotFound("a.png".to_string())
        );

        let refused = ObjectStoreError::Generic {
            store: "S3",
            source: Box::new(io::Error::from(io::ErrorKind::ConnectionRefused)),
        };
        assert!(map_store_error("a.png", refused).is_transport());

        let denied = ObjectStoreError::Generic {
            store: "S3",
            source: Box::new(io::Error::other("access denied")),
        };
        assert!(matches!(
            map_store_error("a.png", denied),
            StorageError::Backend(_)
        ));
    }

    #[test]
    fn test_attribute_round_trip() {
        let mut metadata = Map::new();
        metadata.insert("owner".to_string(), Value::from("alice"));
        metadata.insert("version".to_string(), Value::from(2));

        let attributes = to_attributes("image/png", &metadata);
        let (content_type, back) = from_attributes(&attributes);
        assert_eq!(content_type.as_deref(), Some("image/png"));
        assert_eq!(back.get("owner"), Some(&Value::from("alice")));
        assert_eq!(back.get("version"), Some(&Value::from("2")));
    }

    #[tokio::test]
    async fn test_invalid_key_rejected_before_request() {
        let storage = storage(Some("http://localhost:9000"));
        assert!(matches!(
            storage.delete("../secret").await,
            Err(StorageError::InvalidKey(_))
        ));
    }
}
