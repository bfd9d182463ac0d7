//! Error types for disk operations and autowiring.

use std::io;
use thiserror::Error;

/// Errors produced by disks, the disk manager, and the autowire pipeline.
#[derive(Error, Debug)]
pub enum Error {
    /// A disk with this name is already configured and replace was not requested
    #[error("duplicate disk name: {0}")]
    DuplicateName(String),

    /// Lookup of a disk name with no entry
    #[error("unconfigured disk: {0}")]
    UnconfiguredDisk(String),

    /// A default-disk operation was attempted but no default disk resolves
    #[error("no default disk configured")]
    NoDefaultDisk,

    /// The disk does not generate public URLs
    #[error("disk '{0}' does not provide public URLs")]
    UrlsUnsupported(String),

    /// The same disk name was defined twice within one configuration document
    #[error("duplicate configuration for disk '{0}'")]
    DuplicateDiskConfig(String),

    /// A disk definition field is missing or has the wrong shape
    #[error("invalid config value for disk '{disk}': '{key}' must be {expected}")]
    InvalidConfigValue {
        /// Disk whose definition is malformed
        disk: String,
        /// Offending key within the definition
        key: String,
        /// What the loader expected there
        expected: &'static str,
    },

    /// A provider factory rejected one of its configuration keys
    #[error("invalid configuration value for key '{key}': {reason}")]
    InvalidProviderConfig {
        /// Offending key within the provider's config map
        key: String,
        /// What the factory expected
        reason: String,
    },

    /// A disk definition references a provider with no registered factory
    #[error("unregistered storage provider '{0}'")]
    UnregisteredProvider(String),

    /// Configuration file dispatch found no decoder for the extension
    #[error("unknown file extension for disk configuration: '{0}'")]
    UnknownExtension(String),

    /// Path not found on the backend
    #[error("path not found: {0}")]
    NotFound(String),

    /// Path rejected before reaching the backend
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// I/O error during a disk operation
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Configuration document failed to parse
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Object store error
    #[cfg(any(feature = "s3", feature = "gcs"))]
    #[error("object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    /// Backend error that fits no other variant
    #[error("backend error: {0}")]
    Backend(String),
}

/// Result type for disk operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this is a "not found" error, across backends.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound(_) => true,
            Error::Io(e) => e.kind() == io::ErrorKind::NotFound,
            #[cfg(any(feature = "s3", feature = "gcs"))]
            Error::ObjectStore(object_store::Error::NotFound { .. }) => true,
            _ => false,
        }
    }
}
