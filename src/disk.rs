//! Core disk trait definitions.
//!
//! A [`Disk`] is one configured storage backend: a flat namespace of paths
//! holding byte blobs. Backends that can hand out public URLs additionally
//! expose the [`PublicUrls`] capability.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Base cloud storage operations every backend provides.
///
/// # Thread safety
///
/// Implementations must be `Send + Sync`; the disk manager hands out shared
/// handles and never serializes calls to a single backend.
///
/// # Cancellation
///
/// Operations are plain futures; dropping one cancels the underlying call.
/// No timeout policy is applied at this layer.
#[async_trait]
pub trait Disk: Send + Sync {
    /// Write `data` to the object at `path`, overwriting any existing object.
    ///
    /// No atomicity guarantee beyond what the backend natively provides. A
    /// backend configured to make written objects publicly readable performs
    /// that visibility change as part of `put`; if it fails the whole `put`
    /// fails, without rolling back the content write.
    async fn put(&self, path: &str, data: Bytes) -> Result<()>;

    /// Retrieve the object at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`](crate::Error::NotFound) if the path does
    /// not exist.
    async fn get(&self, path: &str) -> Result<Bytes>;

    /// Delete the object at `path`.
    ///
    /// Whether deleting a missing object is an error follows the backend's
    /// own semantics; it is deliberately not unified here.
    async fn delete(&self, path: &str) -> Result<()>;

    /// Query the public-URL capability.
    ///
    /// Returns `None` for backends that cannot produce public URLs; absence
    /// is a capability check, not an error on the backend itself.
    fn public_urls(&self) -> Option<&dyn PublicUrls> {
        None
    }
}

/// Capability of generating public URLs for stored objects.
#[async_trait]
pub trait PublicUrls: Send + Sync {
    /// Public URL for the object at `path`.
    async fn public_url(&self, path: &str) -> Result<String>;
}
