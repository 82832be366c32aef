//! Logging setup and versioner counters

use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::EnvFilter;

use crate::versioner::SweepStats;

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_filter` (e.g. "info" or
/// "trashcan=debug") is used.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Counters for archive and cleanout activity
#[derive(Debug, Default)]
pub struct Metrics {
    files_archived: AtomicU64,
    sweeps_completed: AtomicU64,
    sweeps_failed: AtomicU64,
    files_purged: AtomicU64,
    dirs_removed: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file_archived(&self) {
        self.files_archived.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "files_archived", "Metric incremented");
    }

    pub fn sweep_completed(&self, stats: &SweepStats) {
        self.sweeps_completed.fetch_add(1, Ordering::Relaxed);
        self.files_purged
            .fetch_add(stats.files_removed as u64, Ordering::Relaxed);
        self.dirs_removed
            .fetch_add(stats.dirs_removed as u64, Ordering::Relaxed);
    }

    pub fn sweep_failed(&self) {
        self.sweeps_failed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "sweeps_failed", "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            files_archived: self.files_archived.load(Ordering::Relaxed),
            sweeps_completed: self.sweeps_completed.load(Ordering::Relaxed),
            sweeps_failed: self.sweeps_failed.load(Ordering::Relaxed),
            files_purged: self.files_purged.load(Ordering::Relaxed),
            dirs_removed: self.dirs_removed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub files_archived: u64,
    pub sweeps_completed: u64,
    pub sweeps_failed: u64,
    pub files_purged: u64,
    pub dirs_removed: u64,
}
