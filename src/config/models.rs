use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub folder: FolderConfig,
    #[serde(default)]
    pub versioning: VersioningConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// The synchronized folder being versioned
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FolderConfig {
    /// Folder identifier, only used in diagnostics
    #[serde(default = "default_folder_id")]
    pub id: String,
    #[serde(default)]
    pub path: PathBuf,
}

impl Default for FolderConfig {
    fn default() -> Self {
        Self {
            id: default_folder_id(),
            path: PathBuf::new(),
        }
    }
}

fn default_folder_id() -> String {
    "default".to_string()
}

/// Versioning strategy and its parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VersioningConfig {
    #[serde(rename = "type", default = "default_versioning_type")]
    pub kind: String,
    /// Strategy parameters, passed through as strings (e.g. `cleanoutDays = "30"`)
    #[serde(default)]
    pub params: HashMap<String, String>,
}

impl Default for VersioningConfig {
    fn default() -> Self {
        Self {
            kind: default_versioning_type(),
            params: HashMap::new(),
        }
    }
}

fn default_versioning_type() -> String {
    "trashcan".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// `tracing` filter used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    "info".to_string()
}
