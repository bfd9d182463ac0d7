//! Loosely-typed configuration values passed to disk providers.
//!
//! The autowire document's per-disk `config` section mirrors the YAML
//! structure as a closed [`ConfigValue`] variant, so providers can validate
//! their own keys without depending on a YAML library.

use std::collections::HashMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A provider configuration map, keyed by configuration key.
pub type ConfigMap = HashMap<String, ConfigValue>;

/// A dynamically-typed configuration value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    /// Explicit null
    Null,
    /// Boolean
    Bool(bool),
    /// Integer number
    Integer(i64),
    /// Floating point number
    Float(f64),
    /// String (may have contained `${ENV_VAR}` placeholders before loading)
    String(String),
    /// Sequence of values
    List(Vec<ConfigValue>),
    /// Nested map
    Map(ConfigMap),
}

impl ConfigValue {
    /// Borrow as a string, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Value as a bool, if this is a bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Value as an i64, if this is an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConfigValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Value as an f64; integers widen.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConfigValue::Integer(n) => Some(*n as f64),
            ConfigValue::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Borrow as a nested map, if this is a map.
    pub fn as_map(&self) -> Option<&ConfigMap> {
        match self {
            ConfigValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Borrow as a list, if this is a list.
    pub fn as_list(&self) -> Option<&[ConfigValue]> {
        match self {
            ConfigValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// True for the explicit null value.
    pub fn is_null(&self) -> bool {
        matches!(self, ConfigValue::Null)
    }

    /// Convert a parsed YAML value.
    ///
    /// Returns `None` for YAML this model cannot represent (tagged values,
    /// mappings with non-string keys); the loader reports those as invalid
    /// config values on the offending key.
    pub(crate) fn from_yaml(value: serde_yaml::Value) -> Option<ConfigValue> {
        use serde_yaml::Value as Yaml;

        Some(match value {
            Yaml::Null => ConfigValue::Null,
            Yaml::Bool(b) => ConfigValue::Bool(b),
            Yaml::Number(n) => {
                if let Some(i) = n.as_i64() {
                    ConfigValue::Integer(i)
                } else {
                    ConfigValue::Float(n.as_f64()?)
                }
            }
            Yaml::String(s) => ConfigValue::String(s),
            Yaml::Sequence(seq) => ConfigValue::List(
                seq.into_iter()
                    .map(ConfigValue::from_yaml)
                    .collect::<Option<Vec<_>>>()?,
            ),
            Yaml::Mapping(mapping) => {
                let mut map = ConfigMap::with_capacity(mapping.len());
                for (key, value) in mapping {
                    let key = match key {
                        Yaml::String(s) => s,
                        _ => return None,
                    };
                    map.insert(key, ConfigValue::from_yaml(value)?);
                }
                ConfigValue::Map(map)
            }
            Yaml::Tagged(_) => return None,
        })
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        ConfigValue::String(s.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        ConfigValue::String(s)
    }
}

impl From<bool> for ConfigValue {
    fn from(b: bool) -> Self {
        ConfigValue::Bool(b)
    }
}

impl From<i64> for ConfigValue {
    fn from(n: i64) -> Self {
        ConfigValue::Integer(n)
    }
}

/// Required non-empty string key, for provider factories.
pub fn require_str<'a>(config: &'a ConfigMap, key: &str) -> Result<&'a str> {
    match optional_str(config, key)? {
        Some(s) if !s.is_empty() => Ok(s),
        _ => Err(Error::InvalidProviderConfig {
            key: key.to_string(),
            reason: format!("{key} must be set"),
        }),
    }
}

/// Optional string key; present-but-not-a-string is an error.
pub fn optional_str<'a>(config: &'a ConfigMap, key: &str) -> Result<Option<&'a str>> {
    match config.get(key) {
        None => Ok(None),
        Some(value) => value.as_str().map(Some).ok_or_else(|| {
            Error::InvalidProviderConfig {
                key: key.to_string(),
                reason: format!("{key} must be a string"),
            }
        }),
    }
}

/// Optional boolean key, defaulting to `false`; present-but-not-a-bool is an error.
pub fn optional_bool(config: &ConfigMap, key: &str) -> Result<bool> {
    match config.get(key) {
        None => Ok(false),
        Some(value) => value.as_bool().ok_or_else(|| Error::InvalidProviderConfig {
            key: key.to_string(),
            reason: format!("{key} must be a boolean"),
        }),
    }
}

/// Replace `${NAME}` placeholders in every string leaf of `config` with the
/// value of environment variable `NAME` (empty string if unset).
///
/// Substitution is textual and single-pass: substituted values are not
/// re-scanned for further placeholders.
pub(crate) fn expand_env(config: &mut ConfigMap) {
    for value in config.values_mut() {
        expand_value(value);
    }
}

fn expand_value(value: &mut ConfigValue) {
    match value {
        ConfigValue::String(s) => *s = expand_env_str(s),
        ConfigValue::Map(map) => expand_env(map),
        ConfigValue::List(items) => {
            for item in items {
                expand_value(item);
            }
        }
        _ => {}
    }
}

fn expand_env_str(s: &str) -> String {
    let placeholder = Regex::new(r"\$\{([^}]+)\}").unwrap();
    placeholder
        .replace_all(s, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_default()
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_conversion() {
        let yaml: serde_yaml::Value = serde_yaml::from_str(
            r#"
bucket: uploads
public: true
retries: 3
ratio: 0.5
tags: [a, b]
nested:
  region: eu
"#,
        )
        .unwrap();

        let value = ConfigValue::from_yaml(yaml).unwrap();
        let map = value.as_map().unwrap();
        assert_eq!(map["bucket"].as_str(), Some("uploads"));
        assert_eq!(map["public"].as_bool(), Some(true));
        assert_eq!(map["retries"].as_i64(), Some(3));
        assert_eq!(map["ratio"].as_f64(), Some(0.5));
        assert_eq!(map["tags"].as_list().unwrap().len(), 2);
        assert_eq!(
            map["nested"].as_map().unwrap()["region"].as_str(),
            Some("eu")
        );
    }

    #[test]
    fn yaml_non_string_keys_rejected() {
        let yaml: serde_yaml::Value = serde_yaml::from_str("1: one").unwrap();
        assert!(ConfigValue::from_yaml(yaml).is_none());
    }

    #[test]
    fn expand_known_variable() {
        std::env::set_var("STOWAGE_TEST_EXPAND", "bar");
        assert_eq!(
            expand_env_str("prefix-${STOWAGE_TEST_EXPAND}-suffix"),
            "prefix-bar-suffix"
        );
    }

    #[test]
    fn expand_unset_variable_to_empty() {
        assert_eq!(expand_env_str("a${STOWAGE_TEST_UNSET_VAR}b"), "ab");
    }

    #[test]
    fn expand_multiple_placeholders() {
        std::env::set_var("STOWAGE_TEST_A", "1");
        std::env::set_var("STOWAGE_TEST_B", "2");
        assert_eq!(
            expand_env_str("${STOWAGE_TEST_A}:${STOWAGE_TEST_B}"),
            "1:2"
        );
    }

    #[test]
    fn expand_is_single_pass() {
        std::env::set_var("STOWAGE_TEST_OUTER", "${STOWAGE_TEST_INNER}");
        std::env::set_var("STOWAGE_TEST_INNER", "nope");
        assert_eq!(
            expand_env_str("v=${STOWAGE_TEST_OUTER}"),
            "v=${STOWAGE_TEST_INNER}"
        );
    }

    #[test]
    fn expand_walks_nested_values() {
        std::env::set_var("STOWAGE_TEST_NESTED", "deep");
        let mut config = ConfigMap::new();
        let mut inner = ConfigMap::new();
        inner.insert("key".to_string(), "${STOWAGE_TEST_NESTED}".into());
        config.insert("outer".to_string(), ConfigValue::Map(inner));
        config.insert(
            "list".to_string(),
            ConfigValue::List(vec!["${STOWAGE_TEST_NESTED}".into(), ConfigValue::Bool(true)]),
        );

        expand_env(&mut config);

        assert_eq!(
            config["outer"].as_map().unwrap()["key"].as_str(),
            Some("deep")
        );
        assert_eq!(config["list"].as_list().unwrap()[0].as_str(), Some("deep"));
    }

    #[test]
    fn helper_accessors() {
        let mut config = ConfigMap::new();
        config.insert("bucket".to_string(), "images".into());
        config.insert("public".to_string(), true.into());
        config.insert("count".to_string(), 2i64.into());

        assert_eq!(require_str(&config, "bucket").unwrap(), "images");
        assert!(require_str(&config, "missing").is_err());
        assert!(require_str(&config, "count").is_err());
        assert_eq!(optional_str(&config, "missing").unwrap(), None);
        assert!(optional_bool(&config, "public").unwrap());
        assert!(!optional_bool(&config, "missing").unwrap());
        assert!(optional_bool(&config, "bucket").is_err());
    }
}
