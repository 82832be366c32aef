use std::path::Path;
use std::sync::Arc;
use tracing::info;

use trashcan::config::Config;
use trashcan::fs::{BasicFilesystem, Filesystem};
use trashcan::versioner::{Trashcan, Versioner, VersionerRegistry};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

fn filesystem(config: &Config) -> Arc<dyn Filesystem> {
    Arc::new(BasicFilesystem::new(&config.folder.path))
}

fn versioner(config: &Config) -> Result<Arc<dyn Versioner>, AnyError> {
    let versioner = VersionerRegistry::with_defaults().create(
        &config.versioning.kind,
        &config.folder.id,
        filesystem(config),
        &config.versioning.params,
    )?;
    Ok(versioner)
}

/// Run background maintenance until Ctrl+C or SIGTERM
pub async fn serve(config: &Config) -> Result<(), AnyError> {
    let versioner = versioner(config)?;
    info!(folder = %config.folder.id, path = %config.folder.path.display(), "Serving {}", versioner);

    let task = tokio::spawn({
        let versioner = Arc::clone(&versioner);
        async move { versioner.serve().await }
    });

    shutdown_signal().await;
    versioner.stop();
    task.await?;

    Ok(())
}

pub fn archive(config: &Config, path: &Path) -> Result<(), AnyError> {
    versioner(config)?.archive(path)?;
    info!(path = %path.display(), "Archived");
    Ok(())
}

/// One immediate cleanout. `days` overrides the configured `cleanoutDays`.
pub fn sweep(config: &Config, days: Option<u32>, json: bool) -> Result<(), AnyError> {
    let mut params = config.versioning.params.clone();
    if let Some(days) = days {
        params.retain(|key, _| !key.eq_ignore_ascii_case("cleanoutDays"));
        params.insert("cleanoutDays".to_string(), days.to_string());
    }

    let trashcan = Trashcan::new(&config.folder.id, filesystem(config), &params);
    if trashcan.cleanout_days() == 0 {
        println!("cleanoutDays is 0, archived files are kept forever; nothing to do");
        return Ok(());
    }

    let stats = trashcan.cleanout_archive()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!(
            "removed {} files ({}) and {} directories, kept {} files (cutoff {})",
            stats.files_removed,
            stats.bytes_reclaimed,
            stats.dirs_removed,
            stats.files_kept,
            stats.cutoff.to_rfc3339()
        );
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
