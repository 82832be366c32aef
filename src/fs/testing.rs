//! Fault injection for filesystem-dependent tests

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use super::{FileInfo, Filesystem};

/// Operation that should fail for a given path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    Lstat(PathBuf),
    Rename(PathBuf),
    Remove(PathBuf),
    Chtimes(PathBuf),
    DirNames(PathBuf),
}

/// Delegates to an inner filesystem, failing the configured operations
pub struct FaultyFilesystem {
    inner: Arc<dyn Filesystem>,
    faults: Vec<Fault>,
}

impl FaultyFilesystem {
    pub fn new(inner: Arc<dyn Filesystem>) -> Self {
        Self {
            inner,
            faults: Vec::new(),
        }
    }

    pub fn with_fault(mut self, fault: Fault) -> Self {
        self.faults.push(fault);
        self
    }

    fn check(&self, fault: Fault) -> io::Result<()> {
        if self.faults.contains(&fault) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("injected fault: {:?}", fault),
            ));
        }
        Ok(())
    }
}

impl Filesystem for FaultyFilesystem {
    fn lstat(&self, path: &Path) -> io::Result<FileInfo> {
        self.check(Fault::Lstat(path.to_path_buf()))?;
        self.inner.lstat(path)
    }

    fn stat(&self, path: &Path) -> io::Result<FileInfo> {
        self.inner.stat(path)
    }

    fn mkdir_all(&self, path: &Path, mode: u32) -> io::Result<()> {
        self.inner.mkdir_all(path, mode)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        self.check(Fault::Rename(from.to_path_buf()))?;
        self.inner.rename(from, to)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        self.check(Fault::Remove(path.to_path_buf()))?;
        self.inner.remove(path)
    }

    fn chtimes(&self, path: &Path, accessed: SystemTime, modified: SystemTime) -> io::Result<()> {
        self.check(Fault::Chtimes(path.to_path_buf()))?;
        self.inner.chtimes(path, accessed, modified)
    }

    fn hide(&self, path: &Path) -> io::Result<()> {
        self.inner.hide(path)
    }

    fn dir_names(&self, path: &Path) -> io::Result<Vec<OsString>> {
        self.check(Fault::DirNames(path.to_path_buf()))?;
        self.inner.dir_names(path)
    }
}
