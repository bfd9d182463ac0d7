//! Local filesystem disk.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tracing::{debug, instrument};

use crate::autowire::{AutoWire, DiskProvider};
use crate::disk::Disk;
use crate::error::{Error, Result};
use crate::value::{require_str, ConfigMap};

/// Provider id for the local filesystem disk.
pub const PROVIDER: &str = "local";

/// Disk storing objects as files under a root directory.
///
/// Object paths map directly onto the directory tree; parent directories are
/// created as needed. Deleting a missing object is a no-op.
#[derive(Debug, Clone)]
pub struct LocalDisk {
    root: PathBuf,
}

impl LocalDisk {
    /// New disk rooted at `root`. The directory is created lazily on the
    /// first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of this disk.
    pub fn root(&self) -> &Path {
        &self.root
    }

    // Map an object path into the root, refusing anything that could escape
    // it. Leading separators and `.` components are tolerated.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let mut resolved = self.root.clone();
        for component in Path::new(path).components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir | Component::RootDir => {}
                Component::ParentDir | Component::Prefix(_) => {
                    return Err(Error::InvalidPath(path.to_string()))
                }
            }
        }
        if resolved == self.root {
            return Err(Error::InvalidPath(path.to_string()));
        }
        Ok(resolved)
    }

    async fn ensure_parent(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Disk for LocalDisk {
    #[instrument(skip(self, data), fields(size = data.len()))]
    async fn put(&self, path: &str, data: Bytes) -> Result<()> {
        let fs_path = self.resolve(path)?;
        self.ensure_parent(&fs_path).await?;

        debug!("writing {} bytes to {:?}", data.len(), fs_path);
        fs::write(&fs_path, &data).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get(&self, path: &str) -> Result<Bytes> {
        let fs_path = self.resolve(path)?;

        match fs::read(&fs_path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self))]
    async fn delete(&self, path: &str) -> Result<()> {
        let fs_path = self.resolve(path)?;
        debug!("deleting {:?}", fs_path);

        match fs::remove_file(&fs_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Factory for [`LocalDisk`]s.
///
/// Keys: `path` (required) — root directory for the disk.
pub struct LocalProvider;

#[async_trait]
impl DiskProvider for LocalProvider {
    async fn create_disk(&self, config: &ConfigMap) -> Result<Arc<dyn Disk>> {
        let path = require_str(config, "path")?;
        Ok(Arc::new(LocalDisk::new(path)))
    }
}

/// Register the local filesystem disk under the `local` provider id.
pub fn register(wire: &mut AutoWire) {
    wire.register_provider(PROVIDER, LocalProvider);
}
