//! Application service: move an application from one installation to another.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::application::ports::{ArtifactStore, ProgressReporter, ProviderGateway};
use crate::application::services::local_snapshot::remove_local;
use crate::application::services::options::EngineOptions;
use crate::application::services::removal::remove;
use crate::application::services::restore::{RestoreReport, restore};
use crate::application::services::snapshot::snapshot;

/// What to do once the application runs on the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrateOptions {
    /// Delete the local snapshot after a successful restore.
    pub clean: bool,
    /// Remove the application from the source installation.
    pub remove_source: bool,
}

impl Default for MigrateOptions {
    fn default() -> Self {
        Self {
            clean: true,
            remove_source: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub restore: RestoreReport,
    /// Local snapshot directory, when it was kept.
    pub snapshot_dir: Option<PathBuf>,
    pub source_removed: bool,
}

/// Snapshot `app_name` on `source`, restore it on `destination`, then clean
/// up as requested.
///
/// Cleanup only happens once every destination server is active. Otherwise
/// the local snapshot and the source application are both kept and a warning
/// names the servers still booting.
///
/// # Errors
///
/// Returns the first failing phase. A failed local cleanup is reported as a
/// warning and the snapshot directory is kept in the report.
pub async fn migrate(
    source: &impl ProviderGateway,
    destination: &impl ProviderGateway,
    store: &impl ArtifactStore,
    reporter: &impl ProgressReporter,
    app_name: &str,
    engine: &EngineOptions,
    options: MigrateOptions,
) -> Result<MigrationReport> {
    let mut snap = snapshot(source, store, reporter, app_name, engine).await?;
    let report = restore(destination, store, reporter, &snap, engine)
        .await
        .with_context(|| format!("snapshot kept in {}", snap.directory.display()))?;

    let booting: Vec<&str> = report
        .services
        .iter()
        .filter(|s| !s.active)
        .map(|s| s.name.as_str())
        .collect();
    let settled = booting.is_empty();
    if !settled && (options.clean || options.remove_source) {
        tracing::warn!(application = app_name, booting = ?booting, "skipping cleanup");
        reporter.warn(&format!(
            "not active on the destination yet: {}; keeping the snapshot and the source",
            booting.join(", ")
        ));
    }

    let mut snapshot_dir = Some(snap.directory.clone());
    if options.clean && settled {
        match remove_local(&mut snap, store).await {
            Ok(()) => snapshot_dir = None,
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), "cannot remove local snapshot");
                reporter.warn(&format!("cannot remove local snapshot: {e:#}"));
            }
        }
    }

    let source_removed = if options.remove_source && settled {
        remove(source, reporter, app_name, &engine.server_wait)
            .await
            .with_context(|| format!("'{app_name}' restored but not removed from the source"))?;
        true
    } else {
        false
    };

    Ok(MigrationReport {
        restore: report,
        snapshot_dir,
        source_removed,
    })
}
