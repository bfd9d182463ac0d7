//! Amazon S3 (and S3-compatible) disk.
//!
//! Uses the `object_store` crate, so MinIO and other S3-compatible services
//! work through the `endpoint` option.
//!
//! # Configuration
//!
//! ```yaml
//! uploads:
//!   provider: s3
//!   config:
//!     bucket: my-uploads
//!     region: eu-central-1
//!     access_key_id: ${AWS_ACCESS_KEY_ID}
//!     secret_access_key: ${AWS_SECRET_ACCESS_KEY}
//!     public: true
//!
//!     # For MinIO or other S3-compatible services
//!     endpoint: http://localhost:9000
//!     allow_http: true
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{HeaderMap, HeaderValue};
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::{ClientOptions, ObjectStore};
use tracing::{debug, instrument};

use crate::autowire::{AutoWire, DiskProvider};
use crate::disk::{Disk, PublicUrls};
use crate::error::{Error, Result};
use crate::value::{optional_bool, optional_str, require_str, ConfigMap};

/// Provider id for the S3 disk.
pub const PROVIDER: &str = "s3";

/// Configuration for the S3 disk.
#[derive(Debug, Clone)]
pub struct S3Config {
    /// Bucket name
    pub bucket: String,
    /// AWS region
    pub region: String,
    /// Optional key prefix for all objects
    pub prefix: Option<String>,
    /// Optional custom endpoint (MinIO etc.)
    pub endpoint: Option<String>,
    /// Use path-style requests (required for MinIO)
    pub force_path_style: bool,
    /// Optional access key (if not using IAM/env credentials)
    pub access_key_id: Option<String>,
    /// Optional secret key
    pub secret_access_key: Option<String>,
    /// Allow HTTP (non-HTTPS) connections
    pub allow_http: bool,
    /// Make every written object publicly readable
    pub public: bool,
}

impl S3Config {
    /// Configuration for AWS proper.
    pub fn aws(bucket: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            region: region.into(),
            prefix: None,
            endpoint: None,
            force_path_style: false,
            access_key_id: None,
            secret_access_key: None,
            allow_http: false,
            public: false,
        }
    }

    /// Configuration for MinIO or other S3-compatible services.
    pub fn minio(bucket: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            region: "us-east-1".to_string(),
            prefix: None,
            endpoint: Some(endpoint.into()),
            force_path_style: true,
            access_key_id: None,
            secret_access_key: None,
            allow_http: true,
            public: false,
        }
    }

    /// Set a key prefix for all objects.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Set explicit credentials.
    pub fn with_credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.access_key_id = Some(access_key_id.into());
        self.secret_access_key = Some(secret_access_key.into());
        self
    }

    /// Make all written objects publicly readable.
    pub fn public(mut self, public: bool) -> Self {
        self.public = public;
        self
    }
}

/// S3-backed disk.
#[derive(Clone)]
pub struct S3Disk {
    store: Arc<dyn ObjectStore>,
    config: S3Config,
}

impl S3Disk {
    /// Build a disk from configuration.
    pub fn new(config: S3Config) -> Result<Self> {
        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(&config.bucket)
            .with_region(&config.region)
            .with_allow_http(config.allow_http);

        if let Some(endpoint) = &config.endpoint {
            builder = builder.with_endpoint(endpoint);
        }

        if config.force_path_style {
            builder = builder.with_virtual_hosted_style_request(false);
        }

        if let (Some(key_id), Some(secret)) = (&config.access_key_id, &config.secret_access_key) {
            builder = builder
                .with_access_key_id(key_id)
                .with_secret_access_key(secret);
        }

        // The visibility change travels with the write request itself: an
        // object-ACL header applied to every request, honored by S3 on PUT.
        if config.public {
            let mut headers = HeaderMap::new();
            headers.insert("x-amz-acl", HeaderValue::from_static("public-read"));
            builder =
                builder.with_client_options(ClientOptions::new().with_default_headers(headers));
        }

        let store = builder.build()?;

        Ok(Self {
            store: Arc::new(store),
            config,
        })
    }

    /// Map an object path into the store, applying the configured prefix.
    fn object_path(&self, path: &str) -> ObjectPath {
        match &self.config.prefix {
            Some(prefix) if !prefix.is_empty() => {
                ObjectPath::from(format!("{}/{}", prefix.trim_end_matches('/'), path))
            }
            _ => ObjectPath::from(path),
        }
    }
}

impl std::fmt::Debug for S3Disk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Disk")
            .field("bucket", &self.config.bucket)
            .field("region", &self.config.region)
            .field("prefix", &self.config.prefix)
            .finish()
    }
}

#[async_trait]
impl Disk for S3Disk {
    #[instrument(skip(self, data), fields(path = %path, size = data.len()))]
    async fn put(&self, path: &str, data: Bytes) -> Result<()> {
        let obj_path = self.object_path(path);
        debug!("writing {} bytes to s3://{:?}", data.len(), obj_path);

        self.store.put(&obj_path, data.into()).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn get(&self, path: &str) -> Result<Bytes> {
        let obj_path = self.object_path(path);
        debug!("reading s3://{:?}", obj_path);

        match self.store.get(&obj_path).await {
            Ok(result) => Ok(result.bytes().await?),
            Err(object_store::Error::NotFound { .. }) => Err(Error::NotFound(path.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn delete(&self, path: &str) -> Result<()> {
        let obj_path = self.object_path(path);
        debug!("deleting s3://{:?}", obj_path);

        match self.store.delete(&obj_path).await {
            Ok(()) => Ok(()),
            // S3 deletes are idempotent
            Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn public_urls(&self) -> Option<&dyn PublicUrls> {
        Some(self)
    }
}

#[async_trait]
impl PublicUrls for S3Disk {
    async fn public_url(&self, path: &str) -> Result<String> {
        let key = self.object_path(path);
        Ok(match &self.config.endpoint {
            Some(endpoint) => format!(
                "{}/{}/{}",
                endpoint.trim_end_matches('/'),
                self.config.bucket,
                key
            ),
            None => format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.config.bucket, self.config.region, key
            ),
        })
    }
}

/// Factory for [`S3Disk`]s.
///
/// Keys: `bucket` and `region` (required); `access_key_id`,
/// `secret_access_key`, `endpoint`, `prefix`, `public`, `allow_http`,
/// `force_path_style` (optional). When `endpoint` is set, path-style
/// addressing is the default.
pub struct S3Provider;

#[async_trait]
impl DiskProvider for S3Provider {
    async fn create_disk(&self, config: &ConfigMap) -> Result<Arc<dyn Disk>> {
        let mut s3_config = S3Config::aws(
            require_str(config, "bucket")?,
            require_str(config, "region")?,
        );

        if let Some(endpoint) = optional_str(config, "endpoint")? {
            s3_config.endpoint = Some(endpoint.to_string());
        }
        s3_config.force_path_style = if config.contains_key("force_path_style") {
            optional_bool(config, "force_path_style")?
        } else {
            s3_config.endpoint.is_some()
        };

        if let (Some(key_id), Some(secret)) = (
            optional_str(config, "access_key_id")?,
            optional_str(config, "secret_access_key")?,
        ) {
            s3_config = s3_config.with_credentials(key_id, secret);
        }

        if let Some(prefix) = optional_str(config, "prefix")? {
            s3_config = s3_config.with_prefix(prefix);
        }
        s3_config.allow_http = optional_bool(config, "allow_http")?;
        s3_config.public = optional_bool(config, "public")?;

        Ok(Arc::new(S3Disk::new(s3_config)?))
    }
}

/// Register the S3 disk under the `s3` provider id.
pub fn register(wire: &mut AutoWire) {
    wire.register_provider(PROVIDER, S3Provider);
}
