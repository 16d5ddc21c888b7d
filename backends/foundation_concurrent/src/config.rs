//! TOML configuration for the map and blocking collection constructors.
//!
//! ```toml
//! [map]
//! concurrency_level = 8
//! initial_capacity = 31
//!
//! [blocking]
//! bounded_capacity = 128
//! ```
//!
//! Every field is optional. Values are validated by the constructors that
//! consume them, not while loading.

use std::path::PathBuf;

use derive_more::derive::From;
use serde::{Deserialize, Serialize};

use crate::map::{default_concurrency_level, DEFAULT_CAPACITY};

#[derive(Debug, From)]
pub enum ConfigError {
    #[from(ignore)]
    IOError(std::io::Error),

    #[from(ignore)]
    DeserializationFailed(toml::de::Error),
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::DeserializationFailed(value)
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::IOError(value)
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::IOError(err) => Some(err),
            Self::DeserializationFailed(err) => Some(err),
        }
    }
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    pub map: MapConfig,
    pub blocking: BlockingConfig,
}

impl ConcurrencyConfig {
    /// Reads and parses the TOML file at `target`.
    ///
    /// # Errors
    ///
    /// Returns `IOError` when the file cannot be read and
    /// `DeserializationFailed` when it is not valid configuration.
    pub fn from_path<V: Into<PathBuf>>(target: V) -> ConfigResult<Self> {
        let target_path = target.into();
        tracing::debug!(path = %target_path.display(), "loading concurrency config");
        let content = std::fs::read_to_string(target_path)?;
        Self::from_toml_str(&content)
    }

    /// # Errors
    ///
    /// Returns `DeserializationFailed` when `content` is not valid configuration.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Number of independently locked segments.
    pub concurrency_level: usize,
    pub initial_capacity: usize,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            concurrency_level: default_concurrency_level(),
            initial_capacity: DEFAULT_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockingConfig {
    /// `None` leaves the collection unbounded.
    pub bounded_capacity: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocking::BlockingCollection;
    use crate::map::ConcurrentMap;

    #[test]
    fn empty_document_uses_defaults() {
        let config = ConcurrencyConfig::from_toml_str("").expect("parses");
        assert_eq!(config, ConcurrencyConfig::default());
        assert_eq!(config.map.initial_capacity, DEFAULT_CAPACITY);
        assert_eq!(config.blocking.bounded_capacity, None);
    }

    #[test]
    fn partial_sections_fill_in_defaults() {
        let config = ConcurrencyConfig::from_toml_str(
            r"
            [map]
            concurrency_level = 3

            [blocking]
            bounded_capacity = 16
            ",
        )
        .expect("parses");

        assert_eq!(config.map.concurrency_level, 3);
        assert_eq!(config.map.initial_capacity, DEFAULT_CAPACITY);
        assert_eq!(config.blocking.bounded_capacity, Some(16));

        let collection = BlockingCollection::<u8>::from_config(&config.blocking).expect("valid");
        assert_eq!(collection.bounded_capacity(), Ok(Some(16)));
        assert!(ConcurrentMap::<u8, u8>::from_config(&config.map).is_ok());
    }

    #[test]
    fn invalid_values_fail_at_construction() {
        let config = ConcurrencyConfig::from_toml_str(
            r"
            map = { concurrency_level = 0 }
            blocking = { bounded_capacity = 0 }
            ",
        )
        .expect("parses");

        assert!(ConcurrentMap::<u8, u8>::from_config(&config.map)
            .expect_err("zero level")
            .is_invalid_argument());
        assert!(BlockingCollection::<u8>::from_config(&config.blocking)
            .expect_err("zero capacity")
            .is_invalid_argument());
    }

    #[test]
    fn malformed_toml_is_reported() {
        let err = ConcurrencyConfig::from_toml_str("[map\n").expect_err("malformed");
        assert!(matches!(err, ConfigError::DeserializationFailed(_)));
    }

    #[test]
    fn loads_from_path() {
        let path = std::env::temp_dir().join(format!(
            "foundation_concurrent_config_{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "[blocking]\nbounded_capacity = 4\n").expect("write config");

        let config = ConcurrencyConfig::from_path(&path).expect("loads");
        std::fs::remove_file(&path).expect("cleanup");
        assert_eq!(config.blocking.bounded_capacity, Some(4));

        let missing = ConcurrencyConfig::from_path(path).expect_err("file removed");
        assert!(matches!(missing, ConfigError::IOError(_)));
    }
}
