//! File versioning strategies
//!
//! A versioner takes over files that sync is about to delete or overwrite and
//! keeps them around somewhere in the folder instead. Versioners are created by
//! name through a [`VersionerRegistry`], so the folder configuration only has to
//! carry the versioning type and its string parameters.
//!
//! ## Key Components
//!
//! - [`Versioner`] - archive entry point plus the background maintenance lifecycle
//! - [`Trashcan`] - moves files into `.stversions` and purges them after `cleanoutDays`
//! - [`VersionerRegistry`] - maps versioning type names to constructors
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use trashcan::fs::BasicFilesystem;
//! use trashcan::versioner::VersionerRegistry;
//!
//! let registry = VersionerRegistry::with_defaults();
//! let params = HashMap::from([("cleanoutDays".to_string(), "30".to_string())]);
//! let versioner = registry.create("trashcan", "default", Arc::new(BasicFilesystem::new("/srv/sync")), &params)?;
//!
//! tokio::spawn({
//!     let versioner = versioner.clone();
//!     async move { versioner.serve().await }
//! });
//! versioner.archive(Path::new("docs/report.txt"))?;
//! versioner.stop();
//! ```

mod cleanout;
mod registry;
mod trashcan;

use async_trait::async_trait;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use cleanout::{SweepStats, cleanout_archive, retention_cutoff};
pub use registry::{RegistryError, VersionerFactory, VersionerRegistry};
pub use trashcan::{Schedule, Trashcan, VERSIONS_DIR, archive_path};

/// Filesystem failures surfaced by a versioner. The underlying I/O error is kept intact.
#[derive(Debug, Error)]
pub enum VersionerError {
    #[error("stat {}: {source}", .path.display())]
    Stat { path: PathBuf, source: io::Error },

    #[error("create directory {}: {source}", .path.display())]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("move {} to {}: {source}", .from.display(), .to.display())]
    Move {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },

    #[error("walk {}: {source}", .path.display())]
    Walk { path: PathBuf, source: io::Error },
}

impl VersionerError {
    pub fn io_kind(&self) -> io::ErrorKind {
        match self {
            VersionerError::Stat { source, .. }
            | VersionerError::CreateDir { source, .. }
            | VersionerError::Move { source, .. }
            | VersionerError::Walk { source, .. } => source.kind(),
        }
    }
}

/// Versioning strategy for one synchronized folder
#[async_trait]
pub trait Versioner: fmt::Display + Send + Sync {
    /// Move the file at `path` (relative to the folder root) out of the live tree.
    ///
    /// `Ok` means the file no longer exists at `path`. A path that is already
    /// gone counts as archived.
    fn archive(&self, path: &Path) -> Result<(), VersionerError>;

    /// Run background maintenance until [`Versioner::stop`] is called
    async fn serve(&self);

    /// Ask a running or not yet started `serve` to exit. Must be called at most once.
    fn stop(&self);
}
