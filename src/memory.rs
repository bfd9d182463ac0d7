//! In-memory disk, for tests and ephemeral scratch space.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;

use crate::autowire::{AutoWire, DiskProvider};
use crate::disk::Disk;
use crate::error::{Error, Result};
use crate::value::ConfigMap;

/// Provider id for the in-memory disk.
pub const PROVIDER: &str = "memory";

/// Disk keeping all objects in process memory.
///
/// Contents are lost on drop. Unlike the local and S3 disks, deleting a
/// missing object is an error here.
#[derive(Debug, Default)]
pub struct MemoryDisk {
    objects: RwLock<HashMap<String, Bytes>>,
}

impl MemoryDisk {
    /// New empty disk.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    /// True when no objects are stored.
    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

#[async_trait]
impl Disk for MemoryDisk {
    async fn put(&self, path: &str, data: Bytes) -> Result<()> {
        self.objects.write().insert(path.to_string(), data);
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Bytes> {
        self.objects
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| Error::NotFound(path.to_string()))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        match self.objects.write().remove(path) {
            Some(_) => Ok(()),
            None => Err(Error::NotFound(path.to_string())),
        }
    }
}

/// Factory for [`MemoryDisk`]s; takes no configuration keys.
pub struct MemoryProvider;

#[async_trait]
impl DiskProvider for MemoryProvider {
    async fn create_disk(&self, _config: &ConfigMap) -> Result<Arc<dyn Disk>> {
        Ok(Arc::new(MemoryDisk::new()))
    }
}

/// Register the in-memory disk under the `memory` provider id.
pub fn register(wire: &mut AutoWire) {
    wire.register_provider(PROVIDER, MemoryProvider);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_delete_roundtrip() {
        let disk = MemoryDisk::new();

        disk.put("a/b.txt", Bytes::from("payload")).await.unwrap();
        assert_eq!(disk.get("a/b.txt").await.unwrap(), Bytes::from("payload"));
        assert_eq!(disk.len(), 1);

        disk.delete("a/b.txt").await.unwrap();
        assert!(disk.is_empty());
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let disk = MemoryDisk::new();
        let err = disk.get("nope").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn delete_missing_is_an_error() {
        let disk = MemoryDisk::new();
        assert!(matches!(
            disk.delete("nope").await,
            Err(Error::NotFound(path)) if path == "nope"
        ));
    }

    #[tokio::test]
    async fn put_overwrites() {
        let disk = MemoryDisk::new();
        disk.put("k", Bytes::from("one")).await.unwrap();
        disk.put("k", Bytes::from("two")).await.unwrap();
        assert_eq!(disk.get("k").await.unwrap(), Bytes::from("two"));
    }

    #[tokio::test]
    async fn no_url_capability() {
        let disk = MemoryDisk::new();
        assert!(disk.public_urls().is_none());
    }
}
