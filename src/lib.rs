//! Pluggable storage disks with declarative autowiring.
//!
//! A [`Disk`] is a named storage backend exposing `put`/`get`/`delete` over a
//! flat path namespace, plus an optional public-URL capability. The
//! [`DiskManager`] holds any number of configured disks behind logical names
//! and delegates unqualified operations to a default disk, and [`AutoWire`]
//! assembles a manager from a YAML document instead of code.
//!
//! # Architecture
//!
//! ```text
//! YAML document ──▶ AutoWire ──▶ DiskProvider factories ──▶ DiskManager
//!                   (loader)     ("s3", "gcs", "local", …)   ├─ "uploads" ──▶ S3Disk
//!                                                            ├─ "scratch" ──▶ LocalDisk
//!                                                            └─ default: "uploads"
//! ```
//!
//! # Quick start
//!
//! ```no_run
//! use stowage::AutoWire;
//! use bytes::Bytes;
//!
//! # async fn example() -> stowage::Result<()> {
//! let mut wire = AutoWire::new();
//! stowage::local::register(&mut wire);
//! stowage::memory::register(&mut wire);
//!
//! wire.load_yaml(
//!     r#"
//! scratch:
//!   provider: local
//!   config:
//!     path: /var/lib/app/scratch
//! cache:
//!   provider: memory
//! default: scratch
//! "#,
//! )?;
//!
//! let disks = wire.build_manager().await?;
//!
//! // Unqualified operations target the default disk.
//! disks.put("greeting.txt", Bytes::from("hello")).await?;
//! let data = disks.get("greeting.txt").await?;
//!
//! // Named access for everything else.
//! disks.disk("cache")?.put("tmp", data).await?;
//! # Ok(())
//! # }
//! ```
//!
//! Configuration strings may embed `${ENV_VAR}` placeholders, substituted at
//! load time. See [`AutoWire`] for the document shape.
//!
//! # Features
//!
//! - `s3` - Amazon S3 / MinIO disk (via `object_store`)
//! - `gcs` - Google Cloud Storage disk (via `object_store`)
//! - `full` - all of the above

mod autowire;
mod disk;
mod error;
mod manager;
mod value;

pub mod local;
pub mod memory;

#[cfg(feature = "s3")]
pub mod s3;

#[cfg(feature = "gcs")]
pub mod gcs;

pub use autowire::{AutoWire, DiskConfig, DiskProvider, ProviderFn};
pub use disk::{Disk, PublicUrls};
pub use error::{Error, Result};
pub use local::LocalDisk;
pub use manager::{ConfigureOptions, DiskManager};
pub use memory::MemoryDisk;
pub use value::{optional_bool, optional_str, require_str, ConfigMap, ConfigValue};

#[cfg(feature = "s3")]
pub use s3::{S3Config, S3Disk};

#[cfg(feature = "gcs")]
pub use gcs::{GcsConfig, GcsDisk};

// Re-export bytes for convenience
pub use bytes::Bytes;
