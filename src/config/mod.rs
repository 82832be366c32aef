//! Configuration management for the trashcan versioner
//!
//! Settings are layered, lowest priority first:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables
//!
//! # Usage
//!
//! ```no_run
//! use trashcan::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Versioning folder: {}", config.folder.path.display());
//! ```
//!
//! # Environment Variables
//!
//! Any key can be overridden with `TRASHCAN__<section>__<key>`:
//! - `TRASHCAN__FOLDER__PATH=/srv/sync`
//! - `TRASHCAN__VERSIONING__PARAMS__CLEANOUTDAYS=30`
//!
//! # Configuration File
//!
//! Loaded from `config/trashcan.toml` unless `TRASHCAN_CONFIG` points elsewhere.

mod models;
mod sources;
mod validation;

pub use models::{Config, FolderConfig, LoggingConfig, VersioningConfig};
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// # Errors
    ///
    /// Returns an error if the file is malformed or validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_minimal_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        fs::write(
            &config_path,
            r#"
[folder]
path = "/srv/sync"
            "#,
        )
        .unwrap();

        let config = Config::load_from_path(config_path).unwrap();
        assert_eq!(config.versioning.kind, "trashcan");
        assert!(config.versioning.params.is_empty());
    }

    #[test]
    fn test_validation_catches_unknown_versioner() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        fs::write(
            &config_path,
            r#"
[folder]
path = "/srv/sync"

[versioning]
type = "simple"
            "#,
        )
        .unwrap();

        let result = Config::load_from_path(config_path);
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::ValidationError(ValidationError::UnknownVersioner { .. })
        ));
    }

    #[test]
    fn test_default_config_lacks_folder_path() {
        // Validated directly so TRASHCAN__FOLDER__PATH in the environment
        // cannot fill the gap.
        assert!(matches!(
            validation::validate(&Config::default()),
            Err(ValidationError::MissingFolderPath)
        ));
    }
}
