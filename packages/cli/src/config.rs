//! Configuration file loading.
//!
//! Settings come from an optional TOML file with `[api]` and `[store]`
//! tables. Environment variables are applied on top, so they win over
//! the file.

use std::path::{Path, PathBuf};

use hotspot_map_api::ApiConfig;
use hotspot_map_store::StoreConfig;
use serde::Deserialize;
use thiserror::Error;

/// Config file read when `--config` is not given. Missing is fine.
pub const DEFAULT_CONFIG_PATH: &str = "hotspot-map.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub store: StoreConfig,
}

impl AppConfig {
    /// Parses a config file's contents.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if `contents` is not valid TOML for
    /// this shape.
    pub fn parse(path: &Path, contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads `path`, or [`DEFAULT_CONFIG_PATH`] if present, then applies
    /// environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an explicitly given file cannot be read,
    /// or if any config file fails to parse.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::read(path)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_PATH);
                if default.exists() {
                    Self::read(default)?
                } else {
                    log::debug!("No {DEFAULT_CONFIG_PATH}, using defaults");
                    Self::default()
                }
            }
        };
        Ok(config.with_env_overrides())
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        log::debug!("Loading config from {}", path.display());
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &contents)
    }

    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        Self {
            api: self.api.with_env_overrides(),
            store: self.store.with_env_overrides(),
        }
    }
}
