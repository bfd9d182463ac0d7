//! Declarative disk configuration ("autowire").
//!
//! An [`AutoWire`] session collects disk definitions — each naming a provider
//! and carrying a loose [`ConfigMap`] — plus the factories able to build
//! them, and wires everything into a ready [`DiskManager`].
//!
//! Definitions can be added programmatically with [`AutoWire::configure`] or
//! loaded from a YAML document:
//!
//! ```yaml
//! uploads:
//!   provider: s3
//!   config:
//!     bucket: my-uploads
//!     region: eu-central-1
//!     secret_access_key: ${AWS_SECRET_ACCESS_KEY}
//! scratch:
//!   provider: local
//!   config:
//!     path: /var/lib/app/scratch
//! default: uploads
//! ```
//!
//! `${NAME}` placeholders in string values are replaced with the value of
//! environment variable `NAME` while loading.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use serde_yaml::Value as Yaml;
use tracing::debug;

use crate::disk::Disk;
use crate::error::{Error, Result};
use crate::manager::{ConfigureOptions, DiskManager};
use crate::value::{expand_env, ConfigMap, ConfigValue};

/// Reserved top-level key naming the default disk.
const DEFAULT_KEY: &str = "default";

/// Factory capable of constructing one kind of disk from a config map.
///
/// Backend-specific keys (bucket names, credentials, visibility flags) are
/// owned and validated by each factory, not by the loader.
#[async_trait]
pub trait DiskProvider: Send + Sync {
    /// Build a disk from the validated, env-substituted config map.
    async fn create_disk(&self, config: &ConfigMap) -> Result<Arc<dyn Disk>>;
}

/// Adapter turning an async function into a [`DiskProvider`].
///
/// ```no_run
/// use std::sync::Arc;
/// use stowage::{AutoWire, ConfigMap, Disk, MemoryDisk, ProviderFn};
///
/// let mut wire = AutoWire::new();
/// wire.register_provider(
///     "scratch",
///     ProviderFn(|_config: ConfigMap| async move {
///         Ok(Arc::new(MemoryDisk::new()) as Arc<dyn Disk>)
///     }),
/// );
/// ```
pub struct ProviderFn<F>(pub F);

#[async_trait]
impl<F, Fut> DiskProvider for ProviderFn<F>
where
    F: Fn(ConfigMap) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Arc<dyn Disk>>> + Send,
{
    async fn create_disk(&self, config: &ConfigMap) -> Result<Arc<dyn Disk>> {
        (self.0)(config.clone()).await
    }
}

/// Configuration for the creation of a single disk.
#[derive(Debug, Clone, PartialEq)]
pub struct DiskConfig {
    /// Provider id resolved against the registered factories
    pub provider: String,
    /// Provider-specific parameters
    pub config: ConfigMap,
}

/// A disk autowiring session.
///
/// Built incrementally via provider registration, programmatic
/// [`configure`](Self::configure) calls, and document [`load`](Self::load)s;
/// consumed by [`build_manager`](Self::build_manager). A session stays valid
/// after building and can be re-built.
#[derive(Default)]
pub struct AutoWire {
    disks: HashMap<String, DiskConfig>,
    providers: HashMap<String, Box<dyn DiskProvider>>,
    default_disk: Option<String>,
}

impl AutoWire {
    /// New empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the factory for a provider id.
    ///
    /// The last registration for an id wins; re-registration during
    /// composition and testing is expected.
    pub fn register_provider(
        &mut self,
        provider: impl Into<String>,
        factory: impl DiskProvider + 'static,
    ) {
        self.providers.insert(provider.into(), Box::new(factory));
    }

    /// Add a disk definition, overwriting any previous definition of `disk`.
    pub fn configure(
        &mut self,
        disk: impl Into<String>,
        provider: impl Into<String>,
        config: ConfigMap,
    ) {
        self.disks.insert(
            disk.into(),
            DiskConfig {
                provider: provider.into(),
                config,
            },
        );
    }

    /// Set the disk that will be configured as the manager's default.
    ///
    /// Unset, the first-wins rule of [`DiskManager::configure`] decides.
    pub fn set_default_disk(&mut self, disk: impl Into<String>) {
        self.default_disk = Some(disk.into());
    }

    /// Name recorded as the intended default disk, if any.
    pub fn default_disk_name(&self) -> Option<&str> {
        self.default_disk.as_deref()
    }

    /// The definition recorded for `disk`, if any.
    pub fn disk_config(&self, disk: &str) -> Option<&DiskConfig> {
        self.disks.get(disk)
    }

    /// Load disk definitions from a configuration file.
    ///
    /// The decoder is chosen by file extension; anything other than
    /// `yml`/`yaml` fails with [`Error::UnknownExtension`].
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yml") | Some("yaml") => {
                let raw = std::fs::read_to_string(path)?;
                self.load_yaml(&raw)
            }
            other => Err(Error::UnknownExtension(other.unwrap_or("").to_string())),
        }
    }

    /// Load disk definitions from a YAML document.
    ///
    /// Loading is all-or-nothing: on any validation error the session is left
    /// untouched. A successful load merges into the session (later documents
    /// overwrite same-name definitions) and records the document's `default`
    /// field — absent meaning none — as the session default.
    pub fn load_yaml(&mut self, document: &str) -> Result<()> {
        let raw: RawDocument = serde_yaml::from_str(document)?;

        let mut disks: HashMap<String, DiskConfig> = HashMap::new();
        let mut default_disk: Option<String> = None;

        for (name, value) in raw.0 {
            if name == DEFAULT_KEY {
                match value {
                    Yaml::String(disk) => default_disk = Some(disk),
                    _ => {
                        return Err(Error::InvalidConfigValue {
                            disk: DEFAULT_KEY.to_string(),
                            key: DEFAULT_KEY.to_string(),
                            expected: "a string naming a disk",
                        })
                    }
                }
                continue;
            }

            if disks.contains_key(&name) {
                return Err(Error::DuplicateDiskConfig(name));
            }

            let definition = parse_definition(&name, value)?;
            disks.insert(name, definition);
        }

        for (name, definition) in disks {
            debug!(disk = %name, provider = %definition.provider, "loaded disk definition");
            self.disks.insert(name, definition);
        }
        self.default_disk = default_disk;

        Ok(())
    }

    /// Build a [`DiskManager`] holding one configured disk per definition.
    ///
    /// Fails with [`Error::UnregisteredProvider`] when a definition names a
    /// provider without a registered factory; factory errors propagate
    /// verbatim. Any failure aborts the whole build — callers never observe a
    /// partially-populated manager.
    pub async fn build_manager(&self) -> Result<DiskManager> {
        let manager = DiskManager::new();

        for (name, disk_config) in &self.disks {
            let factory = self
                .providers
                .get(&disk_config.provider)
                .ok_or_else(|| Error::UnregisteredProvider(disk_config.provider.clone()))?;

            let disk = factory.create_disk(&disk_config.config).await?;

            // A validated session cannot collide on names, so replacement is
            // unconditional; the session default is applied explicitly
            // because map iteration order must not decide it.
            let mut options = ConfigureOptions::new().replace();
            if self.default_disk.as_deref() == Some(name.as_str()) {
                options = options.make_default();
            }
            manager.configure(name.clone(), disk, options)?;
        }

        Ok(manager)
    }
}

impl fmt::Debug for AutoWire {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoWire")
            .field("disks", &self.disks)
            .field("providers", &self.providers.keys().collect::<Vec<_>>())
            .field("default_disk", &self.default_disk)
            .finish()
    }
}

fn parse_definition(disk: &str, value: Yaml) -> Result<DiskConfig> {
    let invalid = |key: &str, expected: &'static str| Error::InvalidConfigValue {
        disk: disk.to_string(),
        key: key.to_string(),
        expected,
    };

    let mapping = match value {
        Yaml::Mapping(mapping) => mapping,
        _ => return Err(invalid("provider", "a string")),
    };

    let mut provider: Option<String> = None;
    let mut raw_config: Option<Yaml> = None;

    for (key, value) in mapping {
        match key {
            Yaml::String(key) if key == "provider" => match value {
                Yaml::String(id) => provider = Some(id),
                _ => return Err(invalid("provider", "a string")),
            },
            Yaml::String(key) if key == "config" => raw_config = Some(value),
            _ => {}
        }
    }

    let provider = provider.ok_or_else(|| invalid("provider", "a string"))?;

    let mut config = match raw_config {
        None => ConfigMap::new(),
        Some(value @ Yaml::Mapping(_)) => match ConfigValue::from_yaml(value) {
            Some(ConfigValue::Map(map)) => map,
            _ => return Err(invalid("config", "a mapping")),
        },
        Some(_) => return Err(invalid("config", "a mapping")),
    };

    expand_env(&mut config);

    Ok(DiskConfig { provider, config })
}

/// Top-level document entries in source order.
///
/// Deserialized through an explicit visitor rather than into a map so the
/// loader sees repeated disk names and can report them as
/// [`Error::DuplicateDiskConfig`].
struct RawDocument(Vec<(String, Yaml)>);

impl<'de> Deserialize<'de> for RawDocument {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DocVisitor;

        impl<'de> Visitor<'de> for DocVisitor {
            type Value = RawDocument;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a mapping of disk names to disk definitions")
            }

            fn visit_map<A>(self, mut access: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::new();
                while let Some(entry) = access.next_entry::<String, Yaml>()? {
                    entries.push(entry);
                }
                Ok(RawDocument(entries))
            }

            // An empty document configures nothing.
            fn visit_unit<E>(self) -> std::result::Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(RawDocument(Vec::new()))
            }
        }

        deserializer.deserialize_map(DocVisitor)
    }
}
