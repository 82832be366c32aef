use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, SystemTime};
use tokio::sync::watch;
use tokio::time::{Instant, sleep};
use tracing::{debug, error, info, warn};

use super::cleanout::{SweepStats, cleanout_archive};
use super::{Versioner, VersionerError};
use crate::fs::Filesystem;
use crate::observability::Metrics;

/// Hidden directory at the folder root holding archived files
pub const VERSIONS_DIR: &str = ".stversions";

const CLEANOUT_DAYS_PARAM: &str = "cleanoutDays";
const DIR_MODE: u32 = 0o777;

const CREATED: u8 = 0;
const RUNNING: u8 = 1;
const STOPPED: u8 = 2;

/// Where `relative` ends up once archived under the folder at `root`
pub fn archive_path(root: &Path, relative: &Path) -> PathBuf {
    root.join(VERSIONS_DIR).join(relative)
}

/// Cleanout timing: first run after `initial_delay`, then every `interval`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub initial_delay: Duration,
    pub interval: Duration,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(60),
            interval: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Versioner that moves files into `.stversions` and purges them after
/// `cleanoutDays` days. Zero days keeps archived files forever.
pub struct Trashcan {
    folder_id: String,
    filesystem: Arc<dyn Filesystem>,
    cleanout_days: u32,
    schedule: Schedule,
    state: AtomicU8,
    stop_tx: watch::Sender<bool>,
    metrics: Arc<Metrics>,
}

/// Registry entry point
pub(super) fn factory(
    folder_id: &str,
    filesystem: Arc<dyn Filesystem>,
    params: &HashMap<String, String>,
) -> Arc<dyn Versioner> {
    Arc::new(Trashcan::new(folder_id, filesystem, params))
}

impl Trashcan {
    pub fn new(
        folder_id: &str,
        filesystem: Arc<dyn Filesystem>,
        params: &HashMap<String, String>,
    ) -> Self {
        let (stop_tx, _) = watch::channel(false);
        let trashcan = Self {
            folder_id: folder_id.to_string(),
            filesystem,
            cleanout_days: parse_cleanout_days(params),
            schedule: Schedule::default(),
            state: AtomicU8::new(CREATED),
            stop_tx,
            metrics: Arc::new(Metrics::new()),
        };

        debug!(
            folder = folder_id,
            cleanout_days = trashcan.cleanout_days,
            "Instantiated {}",
            trashcan
        );
        trashcan
    }

    pub fn with_schedule(mut self, schedule: Schedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn folder_id(&self) -> &str {
        &self.folder_id
    }

    pub fn cleanout_days(&self) -> u32 {
        self.cleanout_days
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Run one cleanout pass now, regardless of schedule or retention setting
    pub fn cleanout_archive(&self) -> Result<SweepStats, VersionerError> {
        cleanout_archive(self.filesystem.as_ref(), self.cleanout_days)
    }

    fn ensure_versions_dir(&self) -> Result<(), VersionerError> {
        let versions_dir = Path::new(VERSIONS_DIR);
        match self.filesystem.stat(versions_dir) {
            Ok(_) => return Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(VersionerError::Stat {
                    path: versions_dir.to_path_buf(),
                    source,
                });
            }
        }

        debug!(folder = %self.folder_id, "Creating versions dir {}", VERSIONS_DIR);
        match self.filesystem.mkdir_all(versions_dir, DIR_MODE) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
            Err(source) => {
                return Err(VersionerError::CreateDir {
                    path: versions_dir.to_path_buf(),
                    source,
                });
            }
        }

        if let Err(e) = self.filesystem.hide(versions_dir) {
            warn!(folder = %self.folder_id, error = %e, "Failed to hide versions dir");
        }
        Ok(())
    }

    async fn run_cleanout(&self) {
        let filesystem = Arc::clone(&self.filesystem);
        let cleanout_days = self.cleanout_days;
        let result =
            tokio::task::spawn_blocking(move || cleanout_archive(filesystem.as_ref(), cleanout_days))
                .await;

        match result {
            Ok(Ok(stats)) => self.metrics.sweep_completed(&stats),
            Ok(Err(e)) => {
                self.metrics.sweep_failed();
                info!(folder = %self.folder_id, error = %e, "Cleaning trashcan failed");
            }
            Err(e) => {
                self.metrics.sweep_failed();
                error!(folder = %self.folder_id, error = %e, "Trashcan cleanout task died");
            }
        }
    }
}

/// `cleanoutDays` as a day count; missing or unparsable means "never clean out"
fn parse_cleanout_days(params: &HashMap<String, String>) -> u32 {
    // Layered config sources may hand keys over lowercased. The exact key
    // wins; among other spellings the smallest key wins.
    let raw = params.get(CLEANOUT_DAYS_PARAM).or_else(|| {
        params
            .iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case(CLEANOUT_DAYS_PARAM))
            .min_by_key(|(key, _)| key.as_str())
            .map(|(_, value)| value)
    });
    let Some(raw) = raw else {
        return 0;
    };

    match raw.trim().parse::<u32>() {
        Ok(days) => days,
        Err(e) => {
            warn!(value = %raw, error = %e, "Invalid cleanoutDays, trash can will not be cleaned out");
            0
        }
    }
}

async fn wait_for_stop(stop_rx: &mut watch::Receiver<bool>) {
    // The sender lives as long as the trashcan, so this only returns on stop.
    let _ = stop_rx.wait_for(|stopped| *stopped).await;
}

#[async_trait]
impl Versioner for Trashcan {
    fn archive(&self, path: &Path) -> Result<(), VersionerError> {
        let info = match self.filesystem.lstat(path) {
            Ok(info) => info,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Not archiving nonexistent file");
                return Ok(());
            }
            Err(source) => {
                return Err(VersionerError::Stat {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        if info.is_symlink {
            panic!("bug: attempting to version a symlink: {}", path.display());
        }

        self.ensure_versions_dir()?;

        debug!(path = %path.display(), "Archiving");
        let archived = archive_path(Path::new(""), path);
        if let Some(parent) = archived.parent() {
            match self.filesystem.mkdir_all(parent, DIR_MODE) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
                Err(source) => {
                    return Err(VersionerError::CreateDir {
                        path: parent.to_path_buf(),
                        source,
                    });
                }
            }
        }

        debug!(to = %archived.display(), "Moving to archive");
        self.filesystem
            .rename(path, &archived)
            .map_err(|source| VersionerError::Move {
                from: path.to_path_buf(),
                to: archived.clone(),
                source,
            })?;

        // The archived mtime is the retention clock.
        let now = SystemTime::now();
        if let Err(e) = self.filesystem.chtimes(&archived, now, now) {
            warn!(path = %archived.display(), error = %e, "Failed to stamp archive time");
        }

        self.metrics.file_archived();
        Ok(())
    }

    async fn serve(&self) {
        match self
            .state
            .compare_exchange(CREATED, RUNNING, Ordering::SeqCst, Ordering::SeqCst)
        {
            Ok(_) => {}
            Err(STOPPED) => {
                debug!("{} already stopped, not serving", self);
                return;
            }
            Err(_) => panic!("bug: {} is already serving", self),
        }

        info!(folder = %self.folder_id, cleanout_days = self.cleanout_days, "{} starting", self);

        let mut stop_rx = self.stop_tx.subscribe();
        let timer = sleep(self.schedule.initial_delay);
        tokio::pin!(timer);

        loop {
            tokio::select! {
                _ = wait_for_stop(&mut stop_rx) => break,
                _ = &mut timer => {
                    if self.cleanout_days > 0 {
                        self.run_cleanout().await;
                    }
                    timer.as_mut().reset(Instant::now() + self.schedule.interval);
                }
            }
        }

        info!(folder = %self.folder_id, "{} stopping", self);
    }

    fn stop(&self) {
        if self.state.swap(STOPPED, Ordering::SeqCst) == STOPPED {
            panic!("bug: {} stopped twice", self);
        }
        self.stop_tx.send_replace(true);
    }
}

impl fmt::Display for Trashcan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trashcan/{}@{:p}", self.folder_id, self)
    }
}
