//! Concurrency-safe container for named disks.
//!
//! The [`DiskManager`] maps logical names to configured [`Disk`] instances
//! and delegates unqualified operations to the default disk. It is itself a
//! [`Disk`], so it can be dropped in anywhere a single disk is expected.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use tracing::debug;

use crate::disk::{Disk, PublicUrls};
use crate::error::{Error, Result};

/// Options for [`DiskManager::configure`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigureOptions {
    replace: bool,
    default: bool,
}

impl ConfigureOptions {
    /// Options with neither flag set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a previously configured disk with the same name instead of
    /// failing with [`Error::DuplicateName`].
    pub fn replace(mut self) -> Self {
        self.replace = true;
        self
    }

    /// Make this disk the default disk.
    pub fn make_default(mut self) -> Self {
        self.default = true;
        self
    }
}

#[derive(Default)]
struct Registry {
    disks: HashMap<String, Arc<dyn Disk>>,
    default: Option<String>,
}

/// Thread-safe container for multiple named disks.
///
/// The first disk configured into an empty manager automatically becomes the
/// default disk; later disks only via [`ConfigureOptions::make_default`].
/// Unqualified `put`/`get`/`delete`/`public_url` calls target the default
/// disk.
///
/// Normally a manager is not built by hand but through
/// [`AutoWire::build_manager`](crate::AutoWire::build_manager).
#[derive(Default)]
pub struct DiskManager {
    registry: RwLock<Registry>,
}

impl DiskManager {
    /// New manager with no disks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a disk under `name`.
    ///
    /// Fails with [`Error::DuplicateName`] if the name is taken and
    /// [`ConfigureOptions::replace`] was not set; the registry is left
    /// unchanged in that case.
    pub fn configure(
        &self,
        name: impl Into<String>,
        disk: Arc<dyn Disk>,
        options: ConfigureOptions,
    ) -> Result<()> {
        let name = name.into();
        let mut registry = self.registry.write();

        if registry.disks.contains_key(&name) && !options.replace {
            return Err(Error::DuplicateName(name));
        }

        registry.disks.insert(name.clone(), disk);

        // The sole disk of a manager is always the default.
        if options.default || registry.disks.len() == 1 {
            registry.default = Some(name.clone());
        }

        debug!(disk = %name, "configured disk");
        Ok(())
    }

    /// Remove the disk under `name`; no error if absent.
    ///
    /// The default name is not reassigned: removing the default disk leaves
    /// it dangling, and default-targeted operations fail with
    /// [`Error::NoDefaultDisk`] until a new default is configured.
    pub fn remove_disk(&self, name: &str) {
        let mut registry = self.registry.write();
        if registry.disks.remove(name).is_some() {
            debug!(disk = %name, "removed disk");
        }
    }

    /// The disk configured under `name`.
    pub fn disk(&self, name: &str) -> Result<Arc<dyn Disk>> {
        let registry = self.registry.read();
        registry
            .disks
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnconfiguredDisk(name.to_string()))
    }

    /// The current default disk.
    ///
    /// Fails with [`Error::NoDefaultDisk`] when no default name is set or the
    /// name no longer resolves to a disk.
    pub fn default_disk(&self) -> Result<Arc<dyn Disk>> {
        self.resolve_default().map(|(_, disk)| disk)
    }

    /// Name of the current default disk, if any.
    ///
    /// The name may be dangling after [`remove_disk`](Self::remove_disk).
    pub fn default_disk_name(&self) -> Option<String> {
        self.registry.read().default.clone()
    }

    /// Names of all configured disks.
    pub fn disk_names(&self) -> Vec<String> {
        self.registry.read().disks.keys().cloned().collect()
    }

    // Snapshot of the default disk, taken under the read lock and released
    // before any backend call.
    fn resolve_default(&self) -> Result<(String, Arc<dyn Disk>)> {
        let registry = self.registry.read();
        let name = registry.default.clone().ok_or(Error::NoDefaultDisk)?;
        match registry.disks.get(&name) {
            Some(disk) => Ok((name, disk.clone())),
            None => Err(Error::NoDefaultDisk),
        }
    }

    /// Write `data` at `path` on the default disk.
    pub async fn put(&self, path: &str, data: Bytes) -> Result<()> {
        let (_, disk) = self.resolve_default()?;
        disk.put(path, data).await
    }

    /// Retrieve the object at `path` from the default disk.
    pub async fn get(&self, path: &str) -> Result<Bytes> {
        let (_, disk) = self.resolve_default()?;
        disk.get(path).await
    }

    /// Delete the object at `path` on the default disk.
    pub async fn delete(&self, path: &str) -> Result<()> {
        let (_, disk) = self.resolve_default()?;
        disk.delete(path).await
    }

    /// Public URL for `path` on the default disk.
    ///
    /// Fails with [`Error::UrlsUnsupported`] when the default disk does not
    /// provide public URLs.
    pub async fn public_url(&self, path: &str) -> Result<String> {
        let (name, disk) = self.resolve_default()?;
        match disk.public_urls() {
            Some(urls) => urls.public_url(path).await,
            None => Err(Error::UrlsUnsupported(name)),
        }
    }
}

#[async_trait]
impl Disk for DiskManager {
    async fn put(&self, path: &str, data: Bytes) -> Result<()> {
        DiskManager::put(self, path, data).await
    }

    async fn get(&self, path: &str) -> Result<Bytes> {
        DiskManager::get(self, path).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        DiskManager::delete(self, path).await
    }

    fn public_urls(&self) -> Option<&dyn PublicUrls> {
        Some(self)
    }
}

#[async_trait]
impl PublicUrls for DiskManager {
    async fn public_url(&self, path: &str) -> Result<String> {
        DiskManager::public_url(self, path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDisk;

    fn mem() -> Arc<dyn Disk> {
        Arc::new(MemoryDisk::new())
    }

    #[test]
    fn first_disk_becomes_default() {
        let manager = DiskManager::new();
        manager
            .configure("a", mem(), ConfigureOptions::new())
            .unwrap();
        assert_eq!(manager.default_disk_name().as_deref(), Some("a"));

        manager
            .configure("b", mem(), ConfigureOptions::new())
            .unwrap();
        assert_eq!(manager.default_disk_name().as_deref(), Some("a"));

        manager
            .configure("c", mem(), ConfigureOptions::new().make_default())
            .unwrap();
        assert_eq!(manager.default_disk_name().as_deref(), Some("c"));
    }

    #[test]
    fn duplicate_name_without_replace() {
        let manager = DiskManager::new();
        let first = mem();
        manager
            .configure("x", first.clone(), ConfigureOptions::new())
            .unwrap();

        let err = manager
            .configure("x", mem(), ConfigureOptions::new())
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateName(name) if name == "x"));
        // Original disk is untouched.
        assert!(Arc::ptr_eq(&manager.disk("x").unwrap(), &first));
    }

    #[test]
    fn replace_overwrites() {
        let manager = DiskManager::new();
        manager
            .configure("x", mem(), ConfigureOptions::new())
            .unwrap();

        let second = mem();
        manager
            .configure("x", second.clone(), ConfigureOptions::new().replace())
            .unwrap();
        assert!(Arc::ptr_eq(&manager.disk("x").unwrap(), &second));
    }

    #[tokio::test]
    async fn empty_manager_reports_no_default() {
        let manager = DiskManager::new();
        assert!(matches!(
            manager.put("f", Bytes::from("x")).await,
            Err(Error::NoDefaultDisk)
        ));
        assert!(matches!(manager.get("f").await, Err(Error::NoDefaultDisk)));
        assert!(matches!(
            manager.delete("f").await,
            Err(Error::NoDefaultDisk)
        ));
        assert!(matches!(
            manager.public_url("f").await,
            Err(Error::NoDefaultDisk)
        ));
    }

    #[test]
    fn named_lookup_keeps_unconfigured_error() {
        let manager = DiskManager::new();
        assert!(matches!(
            manager.disk("nope"),
            Err(Error::UnconfiguredDisk(name)) if name == "nope"
        ));
    }

    #[tokio::test]
    async fn removing_default_leaves_it_dangling() {
        let manager = DiskManager::new();
        manager
            .configure("a", mem(), ConfigureOptions::new())
            .unwrap();
        manager
            .configure("b", mem(), ConfigureOptions::new())
            .unwrap();

        manager.remove_disk("a");
        // Name still recorded, but default-targeted operations fail.
        assert_eq!(manager.default_disk_name().as_deref(), Some("a"));
        assert!(matches!(manager.get("f").await, Err(Error::NoDefaultDisk)));
        // Named lookup of the other disk still works.
        assert!(manager.disk("b").is_ok());
    }

    #[test]
    fn configure_remove_roundtrip() {
        let manager = DiskManager::new();
        let disk = mem();
        manager
            .configure("a", disk.clone(), ConfigureOptions::new())
            .unwrap();
        assert!(Arc::ptr_eq(&manager.disk("a").unwrap(), &disk));

        manager.remove_disk("a");
        assert!(matches!(
            manager.disk("a"),
            Err(Error::UnconfiguredDisk(_))
        ));
        // Removing again is fine.
        manager.remove_disk("a");
    }

    #[tokio::test]
    async fn url_capability_missing() {
        let manager = DiskManager::new();
        manager
            .configure("mem", mem(), ConfigureOptions::new())
            .unwrap();

        let err = manager.public_url("f").await.unwrap_err();
        assert!(matches!(err, Error::UrlsUnsupported(name) if name == "mem"));
    }

    #[tokio::test]
    async fn manager_is_a_disk() {
        let manager = Arc::new(DiskManager::new());
        manager
            .configure("mem", mem(), ConfigureOptions::new())
            .unwrap();

        let as_disk: Arc<dyn Disk> = manager.clone();
        as_disk.put("greeting", Bytes::from("hello")).await.unwrap();
        assert_eq!(as_disk.get("greeting").await.unwrap(), Bytes::from("hello"));
        // The manager always exposes the URL handle; support is checked
        // against the default disk at call time.
        assert!(as_disk.public_urls().is_some());
    }

    #[test]
    fn racing_configures_for_same_name() {
        let manager = Arc::new(DiskManager::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = manager.clone();
                std::thread::spawn(move || {
                    manager
                        .configure(
                            "shared",
                            Arc::new(MemoryDisk::new()) as Arc<dyn Disk>,
                            ConfigureOptions::new(),
                        )
                        .is_ok()
                })
            })
            .collect();

        let wins = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(wins, 1);
        assert_eq!(manager.disk_names(), vec!["shared".to_string()]);
        assert_eq!(manager.default_disk_name().as_deref(), Some("shared"));
    }
}
