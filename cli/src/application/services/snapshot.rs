//! Application service: capture an application into a local snapshot.
//!
//! Per service: ask the compute service for an image of the server, wait for
//! the image to become active, stream its bytes into `<dir>/<service>.raw`
//! and drop the remote copy. The first failing service aborts the snapshot.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::application::ports::{ArtifactStore, ProgressReporter, ProviderGateway};
use crate::application::services::backoff::{Backoff, Probe, await_condition};
use crate::application::services::batch::run_bounded;
use crate::application::services::compensation::{UndoAction, UndoLog};
use crate::application::services::local_snapshot::save_manifest;
use crate::application::services::options::EngineOptions;
use crate::application::services::topology::resolve;
use crate::domain::naming;
use crate::domain::{Application, ImageStatus, MigraError, Service, ServiceSnapshot, Snapshot};

/// Resolve `app_name` and capture it.
///
/// # Errors
///
/// See [`capture`]; additionally `MigraError::NotFound` when the application
/// does not exist.
pub async fn snapshot(
    gateway: &impl ProviderGateway,
    store: &impl ArtifactStore,
    reporter: &impl ProgressReporter,
    app_name: &str,
    options: &EngineOptions,
) -> Result<Snapshot> {
    let app = resolve(gateway, app_name).await?;
    capture(gateway, store, reporter, app, options).await
}

/// Capture an already resolved application and write its manifest.
///
/// # Errors
///
/// Returns the failure of the first service that could not be captured,
/// `MigraError::Timeout` included. Images and artifacts created before the
/// failure are removed only when rollback is enabled.
pub async fn capture(
    gateway: &impl ProviderGateway,
    store: &impl ArtifactStore,
    reporter: &impl ProgressReporter,
    app: Application,
    options: &EngineOptions,
) -> Result<Snapshot> {
    let directory = store
        .create_snapshot_dir(&app.name)
        .await
        .with_context(|| format!("cannot create snapshot directory for '{}'", app.name))?;
    tracing::info!(application = %app.name, directory = %directory.display(), "snapshot started");

    let app_name = app.name.clone();
    let undo = UndoLog::new(options.rollback);
    undo.push(UndoAction::RemoveDirectory {
        path: directory.clone(),
    });

    let ctx = CaptureContext {
        gateway,
        store,
        reporter,
        undo: &undo,
        app: &app.name,
        directory: &directory,
        wait: &options.image_wait,
    };
    let services = app
        .services
        .iter()
        .map(|s| (s.name.clone(), s.clone()))
        .collect();
    let captured = run_bounded(services, options.concurrency, |service| {
        ctx.capture_service(service)
    })
    .await;

    let outcome = match captured {
        Ok(items) => {
            let mut snapshot = Snapshot::new(app, directory);
            snapshot.items = items;
            let saved = save_manifest(&snapshot, store).await;
            saved.map(|()| snapshot)
        }
        Err(e) => Err(e),
    };

    match outcome {
        Ok(snapshot) => {
            reporter.success(&format!("captured {snapshot}"));
            Ok(snapshot)
        }
        Err(e) => {
            undo.unwind(gateway, store, reporter, &options.server_wait)
                .await;
            Err(e.context(format!("cannot snapshot application '{app_name}'")))
        }
    }
}

struct CaptureContext<'a, G, S, R> {
    gateway: &'a G,
    store: &'a S,
    reporter: &'a R,
    undo: &'a UndoLog,
    app: &'a str,
    directory: &'a Path,
    wait: &'a Backoff,
}

impl<G, S, R> CaptureContext<'_, G, S, R>
where
    G: ProviderGateway,
    S: ArtifactStore,
    R: ProgressReporter,
{
    async fn capture_service(&self, service: Service) -> Result<ServiceSnapshot> {
        let image_name = naming::image_name(self.app, &service.name);
        self.reporter
            .step(&format!("creating image of {}...", service.name));
        let image_id = self
            .gateway
            .create_server_image(&service.server_id, &image_name)
            .await
            .with_context(|| format!("cannot create image of {service}"))?;
        let image_undo = UndoAction::DeleteImage {
            id: image_id.clone(),
            name: image_name.clone(),
        };
        self.undo.push(image_undo.clone());

        self.wait_active(&image_id, &image_name)
            .await
            .with_context(|| format!("image of {service} did not become active"))?;

        let image = self
            .gateway
            .get_image(&image_id)
            .await
            .with_context(|| format!("cannot get image of {service}"))?;
        let disk_format = image.disk_format.ok_or_else(|| {
            MigraError::provider(format!("image '{image_name}' has no disk format"))
        })?;
        let container_format = image.container_format.ok_or_else(|| {
            MigraError::provider(format!("image '{image_name}' has no container format"))
        })?;

        self.reporter
            .step(&format!("downloading image of {}...", service.name));
        let path: PathBuf = self
            .directory
            .join(naming::artifact_file_name(&service.name));
        let data = self
            .gateway
            .download_image(&image_id)
            .await
            .with_context(|| format!("cannot download image of {service}"))?;
        self.undo
            .push(UndoAction::RemoveArtifact { path: path.clone() });
        let size_bytes = self
            .store
            .write_artifact(&path, data)
            .await
            .with_context(|| format!("cannot save image of {service}"))?;
        tracing::info!(
            application = self.app,
            service = %service.name,
            bytes = size_bytes,
            path = %path.display(),
            "artifact written"
        );

        match self.gateway.delete_image(&image_id).await {
            Ok(()) => self.undo.retract(&image_undo),
            Err(e) => {
                tracing::warn!(image = %image_name, error = %format!("{e:#}"), "cannot delete remote image");
                self.reporter
                    .warn(&format!("cannot delete remote image {image_name}: {e:#}"));
            }
        }

        Ok(ServiceSnapshot {
            service,
            local_path: Some(path),
            disk_format,
            container_format,
            size_bytes,
        })
    }

    async fn wait_active(&self, image_id: &str, image_name: &str) -> Result<u32> {
        let gateway = self.gateway;
        await_condition(self.wait, || image_probe(gateway, image_id, image_name)).await
    }
}

async fn image_probe(
    gateway: &impl ProviderGateway,
    image_id: &str,
    image_name: &str,
) -> Result<Probe> {
    let image = gateway.get_image(image_id).await?;
    if image.status.is_terminal_failure() {
        return Err(MigraError::provider(format!(
            "image {image_name} ended up {}",
            image.status
        ))
        .into());
    }
    let label = format!("image {image_name} ({})", image.status);
    Ok(if image.status == ImageStatus::Active {
        Probe::ready(label)
    } else {
        Probe::pending(label)
    })
}
