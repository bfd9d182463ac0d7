//! Google Cloud Storage disk.
//!
//! # Configuration
//!
//! ```yaml
//! media:
//!   provider: gcs
//!   config:
//!     bucket: my-media
//!     service_account: /etc/app/service-account.json
//! ```
//!
//! Without `service_account`, credentials resolve from the environment
//! (`GOOGLE_APPLICATION_CREDENTIALS`, metadata server). Object visibility is
//! governed by bucket IAM; there is no per-object ACL option here.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use tracing::{debug, instrument};

use crate::autowire::{AutoWire, DiskProvider};
use crate::disk::{Disk, PublicUrls};
use crate::error::{Error, Result};
use crate::value::{optional_str, require_str, ConfigMap};

/// Provider id for the Google Cloud Storage disk.
pub const PROVIDER: &str = "gcs";

/// Configuration for the GCS disk.
#[derive(Debug, Clone)]
pub struct GcsConfig {
    /// Bucket name
    pub bucket: String,
    /// Path to a service account key file
    pub service_account: Option<String>,
    /// Optional key prefix for all objects
    pub prefix: Option<String>,
}

impl GcsConfig {
    /// Configuration for `bucket` with ambient credentials.
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            service_account: None,
            prefix: None,
        }
    }

    /// Authenticate with a service account key file.
    pub fn with_service_account(mut self, path: impl Into<String>) -> Self {
        self.service_account = Some(path.into());
        self
    }

    /// Set a key prefix for all objects.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }
}

/// Google Cloud Storage backed disk.
#[derive(Clone)]
pub struct GcsDisk {
    store: Arc<dyn ObjectStore>,
    config: GcsConfig,
}

impl GcsDisk {
    /// Build a disk from configuration.
    pub fn new(config: GcsConfig) -> Result<Self> {
        let mut builder = GoogleCloudStorageBuilder::new().with_bucket_name(&config.bucket);

        if let Some(service_account) = &config.service_account {
            builder = builder.with_service_account_path(service_account);
        }

        let store = builder.build()?;

        Ok(Self {
            store: Arc::new(store),
            config,
        })
    }

    fn object_path(&self, path: &str) -> ObjectPath {
        match &self.config.prefix {
            Some(prefix) if !prefix.is_empty() => {
                ObjectPath::from(format!("{}/{}", prefix.trim_end_matches('/'), path))
            }
            _ => ObjectPath::from(path),
        }
    }
}

impl std::fmt::Debug for GcsDisk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GcsDisk")
            .field("bucket", &self.config.bucket)
            .field("prefix", &self.config.prefix)
            .finish()
    }
}

#[async_trait]
impl Disk for GcsDisk {
    #[instrument(skip(self, data), fields(path = %path, size = data.len()))]
    async fn put(&self, path: &str, data: Bytes) -> Result<()> {
        let obj_path = self.object_path(path);
        debug!("writing {} bytes to gs://{:?}", data.len(), obj_path);

        self.store.put(&obj_path, data.into()).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn get(&self, path: &str) -> Result<Bytes> {
        let obj_path = self.object_path(path);
        debug!("reading gs://{:?}", obj_path);

        match self.store.get(&obj_path).await {
            Ok(result) => Ok(result.bytes().await?),
            Err(object_store::Error::NotFound { .. }) => Err(Error::NotFound(path.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn delete(&self, path: &str) -> Result<()> {
        let obj_path = self.object_path(path);
        debug!("deleting gs://{:?}", obj_path);

        // GCS deletes of missing objects fail, and that is surfaced as-is.
        match self.store.delete(&obj_path).await {
            Ok(()) => Ok(()),
            Err(object_store::Error::NotFound { .. }) => Err(Error::NotFound(path.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    fn public_urls(&self) -> Option<&dyn PublicUrls> {
        Some(self)
    }
}

#[async_trait]
impl PublicUrls for GcsDisk {
    async fn public_url(&self, path: &str) -> Result<String> {
        let key = self.object_path(path);
        Ok(format!(
            "https://storage.googleapis.com/{}/{}",
            self.config.bucket, key
        ))
    }
}

/// Factory for [`GcsDisk`]s.
///
/// Keys: `bucket` (required); `service_account`, `prefix` (optional).
pub struct GcsProvider;

#[async_trait]
impl DiskProvider for GcsProvider {
    async fn create_disk(&self, config: &ConfigMap) -> Result<Arc<dyn Disk>> {
        let mut gcs_config = GcsConfig::new(require_str(config, "bucket")?);

        if let Some(service_account) = optional_str(config, "service_account")? {
            gcs_config = gcs_config.with_service_account(service_account);
        }
        if let Some(prefix) = optional_str(config, "prefix")? {
            gcs_config = gcs_config.with_prefix(prefix);
        }

        Ok(Arc::new(GcsDisk::new(gcs_config)?))
    }
}

/// Register the Google Cloud Storage disk under the `gcs` provider id.
pub fn register(wire: &mut AutoWire) {
    wire.register_provider(PROVIDER, GcsProvider);
}
