//! Filesystem capability consumed by the versioners
//!
//! Every path handed to a [`Filesystem`] is relative to its root. The trait is
//! object safe so versioners can share one `Arc<dyn Filesystem>` between the
//! caller-driven archive path and the background sweeper.

use filetime::FileTime;
use std::ffi::OsString;
use std::fs::{self, DirBuilder, Metadata};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

#[cfg(test)]
pub(crate) mod testing;

/// Subset of file metadata the versioners look at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub is_dir: bool,
    pub is_symlink: bool,
    pub modified: SystemTime,
    pub len: u64,
}

impl FileInfo {
    pub fn from_metadata(meta: &Metadata) -> io::Result<Self> {
        Ok(Self {
            is_dir: meta.is_dir(),
            is_symlink: meta.file_type().is_symlink(),
            modified: meta.modified()?,
            len: meta.len(),
        })
    }
}

/// Visitor invoked by [`Filesystem::walk`] for every entry.
///
/// Returning an error stops the walk and that error becomes the walk's result.
pub type WalkFn<'a> = dyn FnMut(&Path, io::Result<FileInfo>) -> io::Result<()> + 'a;

pub trait Filesystem: Send + Sync {
    /// Stat without following a trailing symlink
    fn lstat(&self, path: &Path) -> io::Result<FileInfo>;

    fn stat(&self, path: &Path) -> io::Result<FileInfo>;

    /// Create `path` and any missing parents. Existing directories are not an error.
    fn mkdir_all(&self, path: &Path, mode: u32) -> io::Result<()>;

    /// Atomically move `from` to `to`, replacing a file already at `to`
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Remove a file or an empty directory
    fn remove(&self, path: &Path) -> io::Result<()>;

    fn chtimes(&self, path: &Path, accessed: SystemTime, modified: SystemTime) -> io::Result<()>;

    /// Keep `path` out of normal directory listings.
    ///
    /// [`BasicFilesystem`] relies on the leading dot of the name and does not
    /// set the hidden attribute on Windows, so the versions directory shows up
    /// in Explorer there.
    fn hide(&self, path: &Path) -> io::Result<()>;

    /// Names of the entries directly inside `path`, sorted
    fn dir_names(&self, path: &Path) -> io::Result<Vec<OsString>>;

    /// Pre-order, lexically ordered walk of the tree under `root`.
    ///
    /// Symlinks are reported but never followed. A directory that cannot be
    /// listed is reported a second time with the listing error.
    fn walk(&self, root: &Path, visit: &mut WalkFn<'_>) -> io::Result<()> {
        match self.lstat(root) {
            Ok(info) => walk_entry(self, root, info, visit),
            Err(e) => visit(root, Err(e)),
        }
    }
}

fn walk_entry<F: Filesystem + ?Sized>(
    fs: &F,
    path: &Path,
    info: FileInfo,
    visit: &mut WalkFn<'_>,
) -> io::Result<()> {
    let is_dir = info.is_dir;
    visit(path, Ok(info))?;
    if !is_dir {
        return Ok(());
    }

    let names = match fs.dir_names(path) {
        Ok(names) => names,
        Err(e) => return visit(path, Err(e)),
    };

    for name in names {
        let child = path.join(name);
        match fs.lstat(&child) {
            Ok(info) => walk_entry(fs, &child, info, visit)?,
            Err(e) => visit(&child, Err(e))?,
        }
    }
    Ok(())
}

/// Filesystem rooted at a directory on the host
#[derive(Debug, Clone)]
pub struct BasicFilesystem {
    root: PathBuf,
}

impl BasicFilesystem {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a root-relative path, refusing anything that could escape the root
    fn rooted(&self, path: &Path) -> io::Result<PathBuf> {
        for component in path.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("path escapes filesystem root: {}", path.display()),
                    ));
                }
            }
        }
        Ok(self.root.join(path))
    }
}

impl Filesystem for BasicFilesystem {
    fn lstat(&self, path: &Path) -> io::Result<FileInfo> {
        FileInfo::from_metadata(&fs::symlink_metadata(self.rooted(path)?)?)
    }

    fn stat(&self, path: &Path) -> io::Result<FileInfo> {
        FileInfo::from_metadata(&fs::metadata(self.rooted(path)?)?)
    }

    fn mkdir_all(&self, path: &Path, mode: u32) -> io::Result<()> {
        let mut builder = DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(mode);
        }
        #[cfg(not(unix))]
        let _ = mode;
        builder.create(self.rooted(path)?)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(self.rooted(from)?, self.rooted(to)?)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        let full = self.rooted(path)?;
        if fs::symlink_metadata(&full)?.is_dir() {
            fs::remove_dir(full)
        } else {
            fs::remove_file(full)
        }
    }

    fn chtimes(&self, path: &Path, accessed: SystemTime, modified: SystemTime) -> io::Result<()> {
        // By path, so only ownership matters, not read or write permission.
        filetime::set_file_times(
            self.rooted(path)?,
            FileTime::from_system_time(accessed),
            FileTime::from_system_time(modified),
        )
    }

    fn hide(&self, path: &Path) -> io::Result<()> {
        // The leading dot is the hiding mechanism; nothing else is set.
        self.rooted(path).map(|_| ())
    }

    fn dir_names(&self, path: &Path) -> io::Result<Vec<OsString>> {
        let mut names = fs::read_dir(self.rooted(path)?)?
            .map(|entry| entry.map(|e| e.file_name()))
            .collect::<io::Result<Vec<_>>>()?;
        names.sort();
        Ok(names)
    }
}
