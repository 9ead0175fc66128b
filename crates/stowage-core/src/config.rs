//! Configuration module
//!
//! `StorageConfig` is read once (usually from `STOWAGE_*` environment
//! variables) and then passed explicitly, behind an `Arc`, into every
//! component. Nothing downstream reads the environment again.

use std::env;
use std::time::Duration;

use serde_json::{Map, Value};

use crate::retry_policy::RetryPolicy;
use crate::validation::content_type_matches;

// Common constants
const DEFAULT_BASE_URL: &str = "http://localhost:9000";
const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_BUCKET: &str = "default";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_FILE_SIZE_MB: u64 = 100;
const DEFAULT_ALLOWED_TYPES: &str = "image/*";
const DEFAULT_AUDIT_SERVICE: &str = "stowage-client";

/// Storage client configuration
#[derive(Clone, Debug)]
pub struct StorageConfig {
    // Connection settings
    pub base_url: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub bucket_name: String,
    // Performance settings
    pub timeout: Duration,
    pub retry_policy: RetryPolicy,
    // File validation settings
    pub max_file_size: u64,
    pub allowed_types: Vec<String>,
    // Audit settings
    pub enable_audit: bool,
    pub audit_service: String,
    pub audit_metadata: Map<String, Value>,
    // Security settings
    pub allowed_origins: Vec<String>,
    pub environment: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let mut audit_metadata = Map::new();
        audit_metadata.insert(
            "version".to_string(),
            Value::String(env!("CARGO_PKG_VERSION").to_string()),
        );
        audit_metadata.insert(
            "environment".to_string(),
            Value::String("development".to_string()),
        );

        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            access_key: String::new(),
            secret_key: String::new(),
            region: DEFAULT_REGION.to_string(),
            bucket_name: DEFAULT_BUCKET.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retry_policy: RetryPolicy::default(),
            max_file_size: DEFAULT_MAX_FILE_SIZE_MB * 1024 * 1024,
            allowed_types: split_list(DEFAULT_ALLOWED_TYPES),
            enable_audit: true,
            audit_service: DEFAULT_AUDIT_SERVICE.to_string(),
            audit_metadata,
            allowed_origins: vec!["*".to_string()],
            environment: "development".to_string(),
        }
    }
}

impl StorageConfig {
    /// Load configuration from the process environment (and `.env`, if present).
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// Unparseable numeric values fall back to their defaults, matching how
    /// the rest of the configuration surface behaves.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let environment = var("STOWAGE_ENVIRONMENT")
            .or_else(|| var("ENVIRONMENT"))
            .unwrap_or_else(|| "development".to_string());

        let timeout_secs = var("STOWAGE_TIMEOUT_SECONDS")
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let max_file_size_mb = var("STOWAGE_MAX_FILE_SIZE_MB")
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_MAX_FILE_SIZE_MB);

        let default_policy = RetryPolicy::default();
        let retry_policy = RetryPolicy::builder()
            .max_attempts(
                var("STOWAGE_RETRY_MAX_ATTEMPTS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(default_policy.max_attempts()),
            )
            .base_delay(
                var("STOWAGE_RETRY_BASE_DELAY_MS")
                    .and_then(|s| s.parse().ok())
                    .map(Duration::from_millis)
                    .unwrap_or(default_policy.base_delay()),
            )
            .backoff_multiplier(
                var("STOWAGE_RETRY_BACKOFF")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(default_policy.backoff_multiplier()),
            )
            .build()
            .map_err(|e| anyhow::anyhow!("Invalid retry configuration: {}", e))?;

        let mut audit_metadata = defaults.audit_metadata.clone();
        audit_metadata.insert(
            "environment".to_string(),
            Value::String(environment.clone()),
        );

        let config = StorageConfig {
            base_url: var("STOWAGE_BASE_URL").unwrap_or(defaults.base_url),
            access_key: var("STOWAGE_ACCESS_KEY").unwrap_or_default(),
            secret_key: var("STOWAGE_SECRET_KEY").unwrap_or_default(),
            region: var("STOWAGE_REGION").unwrap_or(defaults.region),
            bucket_name: var("STOWAGE_BUCKET_NAME").unwrap_or(defaults.bucket_name),
            timeout: Duration::from_secs(timeout_secs),
            retry_policy,
            max_file_size: max_file_size_mb * 1024 * 1024,
            allowed_types: var("STOWAGE_ALLOWED_TYPES")
                .map(|s| split_list(&s))
                .unwrap_or(defaults.allowed_types),
            enable_audit: var("STOWAGE_ENABLE_AUDIT")
                .map(|s| s.trim().to_lowercase())
                .and_then(|s| s.parse().ok())
                .unwrap_or(true),
            audit_service: var("STOWAGE_AUDIT_SERVICE").unwrap_or(defaults.audit_service),
            audit_metadata,
            allowed_origins: var("STOWAGE_ALLOWED_ORIGINS")
                .map(|s| split_list(&s))
                .unwrap_or(defaults.allowed_origins),
            environment,
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration for a named service.
    ///
    /// `STOWAGE_SERVICE_PREFIX` is prepended to the bucket name and the service
    /// name is recorded in the audit metadata.
    pub fn for_service(service_name: &str) -> Result<Self, anyhow::Error> {
        let prefix = env::var("STOWAGE_SERVICE_PREFIX").ok();
        Ok(Self::from_env()?.with_service(service_name, prefix.as_deref()))
    }

    /// Apply service-specific overrides to an already loaded configuration.
    pub fn with_service(mut self, service_name: &str, prefix: Option<&str>) -> Self {
        if let Some(prefix) = prefix.filter(|p| !p.is_empty()) {
            self.bucket_name = format!("{}-{}", prefix, self.bucket_name);
        }
        self.audit_metadata.insert(
            "service_name".to_string(),
            Value::String(service_name.to_string()),
        );
        self
    }

    /// Check if the client is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.base_url.is_empty() {
            return Err(anyhow::anyhow!("STOWAGE_BASE_URL is required"));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(anyhow::anyhow!(
                "STOWAGE_BASE_URL must be an http(s) URL, got {}",
                self.base_url
            ));
        }

        if self.bucket_name.is_empty() {
            return Err(anyhow::anyhow!("STOWAGE_BUCKET_NAME is required"));
        }

        if self.is_production() && (self.access_key.is_empty() || self.secret_key.is_empty()) {
            return Err(anyhow::anyhow!(
                "STOWAGE_ACCESS_KEY and STOWAGE_SECRET_KEY must be set in production"
            ));
        }

        if self.max_file_size == 0 {
            return Err(anyhow::anyhow!("STOWAGE_MAX_FILE_SIZE_MB must be positive"));
        }

        if self.timeout.is_zero() {
            return Err(anyhow::anyhow!("STOWAGE_TIMEOUT_SECONDS must be positive"));
        }

        if self.allowed_types.is_empty() {
            return Err(anyhow::anyhow!(
                "STOWAGE_ALLOWED_TYPES must list at least one content type"
            ));
        }

        self.retry_policy.validate()?;

        Ok(())
    }

    /// Check whether a content type matches any allowed pattern
    /// (exact, or `type/*` wildcard).
    pub fn is_allowed_type(&self, content_type: &str) -> bool {
        self.allowed_types
            .iter()
            .any(|pattern| content_type_matches(pattern, content_type))
    }

    pub fn is_allowed_origin(&self, origin: &str) -> bool {
        self.allowed_origins
            .iter()
            .any(|allowed| allowed == "*" || allowed == origin)
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
