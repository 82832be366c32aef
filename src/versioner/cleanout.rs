//! Retention sweep over the versions directory

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::VersionerError;
use super::trashcan::VERSIONS_DIR;
use crate::fs::Filesystem;
use crate::humanize::ByteSize;

/// Outcome of one cleanout pass
#[derive(Debug, Clone, Serialize)]
pub struct SweepStats {
    pub cutoff: DateTime<Utc>,
    pub files_removed: usize,
    pub files_kept: usize,
    pub dirs_removed: usize,
    pub bytes_reclaimed: ByteSize,
}

impl SweepStats {
    fn new(cutoff: DateTime<Utc>) -> Self {
        Self {
            cutoff,
            files_removed: 0,
            files_kept: 0,
            dirs_removed: 0,
            bytes_reclaimed: ByteSize::default(),
        }
    }
}

/// Oldest modification time that still survives a sweep started at `now`.
///
/// Retention windows reaching past the earliest representable date clamp to
/// it, so nothing is old enough to expire.
pub fn retention_cutoff(now: DateTime<Utc>, cleanout_days: u32) -> DateTime<Utc> {
    Duration::try_days(i64::from(cleanout_days))
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Directory the walk is currently inside, with the number of files kept in it so far
struct CurrentDir {
    path: PathBuf,
    files_kept: usize,
}

impl CurrentDir {
    /// Try to remove the directory if nothing was kept in it. Failure is fine:
    /// it usually means the directory still has subdirectories, and a later
    /// sweep will get it once those are gone.
    fn finish(self, filesystem: &dyn Filesystem, stats: &mut SweepStats) {
        if self.files_kept > 0 {
            return;
        }
        match filesystem.remove(&self.path) {
            Ok(()) => {
                stats.dirs_removed += 1;
                debug!(path = %self.path.display(), "Removed empty archive directory");
            }
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "Keeping archive directory");
            }
        }
    }
}

/// Delete archived files older than `cleanout_days` and the directories left without files.
///
/// A single pre-order pass: each directory is judged when the walk enters the
/// next directory, using only the files counted directly inside it. A parent
/// that becomes empty because its last child directory was removed in this
/// pass is only reclaimed by the next pass.
pub fn cleanout_archive(
    filesystem: &dyn Filesystem,
    cleanout_days: u32,
) -> Result<SweepStats, VersionerError> {
    let versions_dir = Path::new(VERSIONS_DIR);
    let cutoff = retention_cutoff(Utc::now(), cleanout_days);
    let mut stats = SweepStats::new(cutoff);

    if let Err(e) = filesystem.lstat(versions_dir) {
        if e.kind() == io::ErrorKind::NotFound {
            debug!("No versions directory, nothing to clean out");
            return Ok(stats);
        }
    }

    let mut current: Option<CurrentDir> = None;
    let mut failed_at: Option<PathBuf> = None;

    let walked = filesystem.walk(versions_dir, &mut |path, info| {
        let info = match info {
            Ok(info) => info,
            Err(e) => {
                failed_at = Some(path.to_path_buf());
                return Err(e);
            }
        };

        if info.is_dir {
            if let Some(previous) = current.take() {
                previous.finish(filesystem, &mut stats);
            }
            current = Some(CurrentDir {
                path: path.to_path_buf(),
                files_kept: 0,
            });
            return Ok(());
        }

        if DateTime::<Utc>::from(info.modified) < cutoff {
            match filesystem.remove(path) {
                Ok(()) => {
                    stats.files_removed += 1;
                    stats.bytes_reclaimed += info.len;
                }
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "Failed to remove expired file");
                }
            }
        } else {
            stats.files_kept += 1;
            if let Some(dir) = current.as_mut() {
                dir.files_kept += 1;
            }
        }
        Ok(())
    });

    if let Err(source) = walked {
        return Err(VersionerError::Walk {
            path: failed_at.unwrap_or_else(|| versions_dir.to_path_buf()),
            source,
        });
    }

    // The walk only judges a directory when it enters the next one.
    if let Some(last) = current {
        last.finish(filesystem, &mut stats);
    }

    info!(
        cutoff = %stats.cutoff.to_rfc3339(),
        files_removed = stats.files_removed,
        files_kept = stats.files_kept,
        dirs_removed = stats.dirs_removed,
        reclaimed = %stats.bytes_reclaimed,
        "Trash can cleanout complete"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::BasicFilesystem;
    use crate::fs::testing::{Fault, FaultyFilesystem};
    use std::sync::Arc;
    use std::time::SystemTime;
    use tempfile::TempDir;

    const DAY: std::time::Duration = std::time::Duration::from_secs(86400);

    fn setup() -> (TempDir, BasicFilesystem) {
        let temp_dir = TempDir::new().unwrap();
        let fs = BasicFilesystem::new(temp_dir.path());
        (temp_dir, fs)
    }

    /// Write an archived file under the versions dir with an mtime `age` in the past
    fn archived(fs: &BasicFilesystem, relative: &str, age: std::time::Duration) {
        let path = Path::new(VERSIONS_DIR).join(relative);
        let full = fs.root().join(&path);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(&full, b"archived").unwrap();
        let when = SystemTime::now() - age;
        fs.chtimes(&path, when, when).unwrap();
    }

    fn exists(fs: &BasicFilesystem, relative: &str) -> bool {
        fs.root().join(VERSIONS_DIR).join(relative).exists()
    }

    #[test]
    fn test_retention_cutoff() {
        let now = Utc::now();
        assert_eq!(retention_cutoff(now, 0), now);
        assert_eq!(retention_cutoff(now, 2), now - Duration::hours(48));
    }

    #[test]
    fn test_retention_cutoff_clamps_huge_windows() {
        let now = Utc::now();
        assert_eq!(retention_cutoff(now, u32::MAX), DateTime::<Utc>::MIN_UTC);
        assert_eq!(retention_cutoff(now, 100_000_000), DateTime::<Utc>::MIN_UTC);
    }

    #[test]
    fn test_huge_retention_keeps_everything() {
        let (_temp_dir, fs) = setup();
        archived(&fs, "a/ancient.txt", 3650 * DAY);

        let stats = cleanout_archive(&fs, 100_000_000).unwrap();

        assert_eq!(stats.files_removed, 0);
        assert_eq!(stats.files_kept, 1);
        assert!(exists(&fs, "a/ancient.txt"));
    }

    #[test]
    fn test_missing_versions_dir_is_noop() {
        let (_temp_dir, fs) = setup();

        let stats = cleanout_archive(&fs, 7).unwrap();
        assert_eq!(stats.files_removed, 0);
        assert_eq!(stats.dirs_removed, 0);
    }

    #[test]
    fn test_removes_only_expired_files() {
        let (_temp_dir, fs) = setup();
        archived(&fs, "docs/old.txt", 10 * DAY);
        archived(&fs, "docs/new.txt", DAY / 2);
        archived(&fs, "top-old.txt", 8 * DAY);

        let stats = cleanout_archive(&fs, 7).unwrap();

        assert_eq!(stats.files_removed, 2);
        assert_eq!(stats.files_kept, 1);
        assert_eq!(stats.bytes_reclaimed.as_u64(), 16);
        assert!(!exists(&fs, "docs/old.txt"));
        assert!(!exists(&fs, "top-old.txt"));
        assert!(exists(&fs, "docs/new.txt"));
    }

    #[test]
    fn test_emptied_leaf_directory_removed_in_same_pass() {
        let (_temp_dir, fs) = setup();
        archived(&fs, "a/b.txt", 2 * DAY);

        cleanout_archive(&fs, 1).unwrap();

        assert!(!exists(&fs, "a/b.txt"));
        assert!(!exists(&fs, "a"));
    }

    #[test]
    fn test_sibling_directories_judged_separately() {
        let (_temp_dir, fs) = setup();
        archived(&fs, "a/old.txt", 5 * DAY);
        archived(&fs, "b/new.txt", std::time::Duration::ZERO);
        archived(&fs, "c/old.txt", 5 * DAY);

        let stats = cleanout_archive(&fs, 1).unwrap();

        assert!(!exists(&fs, "a"));
        assert!(exists(&fs, "b/new.txt"));
        assert!(!exists(&fs, "c"));
        assert_eq!(stats.dirs_removed, 2);
    }

    #[test]
    fn test_nested_empty_directories_take_two_passes() {
        let (_temp_dir, fs) = setup();
        archived(&fs, "x/y/old.txt", 3 * DAY);

        cleanout_archive(&fs, 1).unwrap();
        assert!(!exists(&fs, "x/y"));
        assert!(exists(&fs, "x"));

        cleanout_archive(&fs, 1).unwrap();
        assert!(!exists(&fs, "x"));
    }

    #[test]
    fn test_directory_with_survivor_is_kept() {
        let (_temp_dir, fs) = setup();
        archived(&fs, "keep/fresh.txt", DAY / 4);
        archived(&fs, "keep/stale.txt", 4 * DAY);

        let stats = cleanout_archive(&fs, 1).unwrap();

        assert!(exists(&fs, "keep/fresh.txt"));
        assert!(!exists(&fs, "keep/stale.txt"));
        assert_eq!(stats.dirs_removed, 0);
    }

    #[test]
    fn test_unreadable_directory_aborts_sweep() {
        let (_temp_dir, fs) = setup();
        archived(&fs, "a/old.txt", 5 * DAY);
        archived(&fs, "b/old.txt", 5 * DAY);

        let broken = Path::new(VERSIONS_DIR).join("b");
        let faulty = FaultyFilesystem::new(Arc::new(fs.clone()))
            .with_fault(Fault::DirNames(broken.clone()));

        let err = cleanout_archive(&faulty, 1).unwrap_err();

        assert!(matches!(&err, VersionerError::Walk { path, .. } if *path == broken));
        // Work done before the failure stays done
        assert!(!exists(&fs, "a/old.txt"));
        assert!(exists(&fs, "b/old.txt"));
    }

    #[test]
    fn test_failed_file_removal_is_tolerated() {
        let (_temp_dir, fs) = setup();
        archived(&fs, "a/old.txt", 5 * DAY);

        let stuck = Path::new(VERSIONS_DIR).join("a/old.txt");
        let faulty = FaultyFilesystem::new(Arc::new(fs.clone())).with_fault(Fault::Remove(stuck));

        let stats = cleanout_archive(&faulty, 1).unwrap();

        assert_eq!(stats.files_removed, 0);
        assert!(exists(&fs, "a/old.txt"));
    }
}
