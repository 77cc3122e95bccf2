//! Configuration management for perifcontrol.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "perifcontrol";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "perifcontrol.db";

/// Environment variable prefix.
const ENV_PREFIX: &str = "PERIFCONTROL_";

/// Default storage quota: 5 MiB, the usual browser local-storage budget.
pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `PERIFCONTROL_`, sections split by `__`)
/// 2. TOML config file at `~/.config/perifcontrol/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Spreadsheet import configuration.
    pub import: ImportConfig,
    /// Spreadsheet export configuration.
    pub export: ExportConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/perifcontrol/perifcontrol.db`
    pub database_path: Option<PathBuf>,
    /// Maximum bytes stored across all keys.
    /// Set to 0 for unlimited.
    pub quota_bytes: usize,
}

/// Import-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Skip rows identical to a stored record.
    pub skip_duplicates: bool,
    /// Field delimiter of imported files.
    pub delimiter: char,
}

/// Export-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Field delimiter of exported files.
    pub delimiter: char,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None, // Resolved at runtime
            quota_bytes: DEFAULT_QUOTA_BYTES,
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            skip_duplicates: false,
            delimiter: ',',
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self { delimiter: ',' }
    }
}

fn check_delimiter(name: &str, delimiter: char) -> Result<()> {
    if !delimiter.is_ascii() || delimiter.is_ascii_alphanumeric() || delimiter == '"' {
        return Err(Error::ConfigValidation {
            message: format!("{name} must be an ASCII punctuation or whitespace character, got {delimiter:?}"),
        });
    }
    Ok(())
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if let Some(path) = &self.storage.database_path {
            if path.as_os_str().is_empty() {
                return Err(Error::ConfigValidation {
                    message: "database_path cannot be empty".to_string(),
                });
            }
        }

        check_delimiter("import.delimiter", self.import.delimiter)?;
        check_delimiter("export.delimiter", self.export.delimiter)?;

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Import delimiter as the byte the CSV reader expects.
    #[must_use]
    pub fn import_delimiter(&self) -> u8 {
        delimiter_byte(self.import.delimiter)
    }

    /// Export delimiter as the byte the CSV writer expects.
    #[must_use]
    pub fn export_delimiter(&self) -> u8 {
        delimiter_byte(self.export.delimiter)
    }
}

fn delimiter_byte(delimiter: char) -> u8 {
    u8::try_from(delimiter).unwrap_or(b',')
}
