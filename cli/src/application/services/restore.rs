//! Application service: recreate an application from a local snapshot.
//!
//! The network, subnet and router attachment are created first, always from
//! scratch. Only then are the services restored, each one getting its image
//! uploaded, its port recreated with the same fixed IP and its server booted.

use std::net::IpAddr;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::application::ports::{
    ArtifactStore, ImageSpec, PortSpec, ProgressReporter, ProviderGateway, ServerSpec, SubnetSpec,
};
use crate::application::services::backoff::{Backoff, Probe, await_condition};
use crate::application::services::batch::run_bounded;
use crate::application::services::compensation::{UndoAction, UndoLog};
use crate::application::services::local_snapshot::available;
use crate::application::services::options::EngineOptions;
use crate::domain::naming;
use crate::domain::{ErrorKind, MigraError, ServerStatus, ServiceSnapshot, Snapshot};

/// Outcome of a restore.
#[derive(Debug, Clone, Serialize)]
pub struct RestoreReport {
    pub application: String,
    pub network_id: String,
    pub subnet_id: String,
    pub services: Vec<RestoredService>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RestoredService {
    pub name: String,
    pub server_id: String,
    pub port_id: String,
    pub fixed_ip: IpAddr,
    /// `false` when the server was still booting at the deadline.
    pub active: bool,
    pub warnings: Vec<String>,
}

impl RestoreReport {
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.services.iter().map(|s| s.warnings.len()).sum()
    }
}

/// Network created by the first phase of a restore.
struct Landing {
    network_id: String,
    subnet_id: String,
}

/// Recreate `snapshot` on the installation behind `gateway`.
///
/// # Errors
///
/// Returns `MigraError::NotAvailable` before any remote call when local
/// artifacts are missing, a provider error when the installation has no
/// router or lacks the configured flavor, and otherwise the failure of the
/// first service that could not be restored. A server that is still booting
/// at the deadline is only a warning.
pub async fn restore(
    gateway: &impl ProviderGateway,
    store: &impl ArtifactStore,
    reporter: &impl ProgressReporter,
    snapshot: &Snapshot,
    options: &EngineOptions,
) -> Result<RestoreReport> {
    let app = &snapshot.application;
    if !available(snapshot, store).await {
        return Err(MigraError::NotAvailable {
            application: app.name.clone(),
        }
        .into());
    }
    let router_id = gateway.router_id().ok_or_else(|| {
        MigraError::provider(format!(
            "destination has no router to attach application '{}' to",
            app.name
        ))
    })?;

    let undo = UndoLog::new(options.rollback);
    let outcome = async {
        let landing = create_landing(gateway, reporter, &undo, snapshot, router_id).await?;
        let flavor_id = gateway
            .find_flavor(&options.flavor)
            .await
            .with_context(|| format!("cannot look up flavor '{}'", options.flavor))?
            .ok_or_else(|| MigraError::provider(format!("flavor '{}' not found", options.flavor)))?;

        let ctx = RestoreContext {
            gateway,
            store,
            reporter,
            undo: &undo,
            app: &app.name,
            landing: &landing,
            flavor_id: &flavor_id,
            security_groups: &options.security_groups,
            wait: &options.server_wait,
        };
        let items = snapshot
            .items
            .iter()
            .map(|item| (item.service.name.clone(), item.clone()))
            .collect();
        let services = run_bounded(items, options.concurrency, |item| ctx.restore_service(item)).await?;
        Ok::<_, anyhow::Error>(RestoreReport {
            application: app.name.clone(),
            network_id: landing.network_id.clone(),
            subnet_id: landing.subnet_id.clone(),
            services,
        })
    }
    .await;

    match outcome {
        Ok(report) => {
            reporter.success(&format!(
                "restored {} ({} services)",
                report.application,
                report.services.len()
            ));
            Ok(report)
        }
        Err(e) => {
            undo.unwind(gateway, store, reporter, &options.server_wait)
                .await;
            Err(e.context(format!("cannot restore application '{}'", app.name)))
        }
    }
}

async fn create_landing(
    gateway: &impl ProviderGateway,
    reporter: &impl ProgressReporter,
    undo: &UndoLog,
    snapshot: &Snapshot,
    router_id: &str,
) -> Result<Landing> {
    let app = &snapshot.application;
    let network_name = naming::network_name(&app.name);
    let subnet_name = naming::subnet_name(&app.name);

    reporter.step(&format!("creating network {network_name}..."));
    let network = gateway
        .create_network(&network_name)
        .await
        .with_context(|| format!("cannot create network for '{}'", app.name))?;
    undo.push(UndoAction::DeleteNetwork {
        id: network.id.clone(),
        name: network_name,
    });

    let subnet = gateway
        .create_subnet(&SubnetSpec {
            name: &subnet_name,
            network_id: &network.id,
            plan: &app.plan,
        })
        .await
        .with_context(|| format!("cannot create subnet for '{}'", app.name))?;

    gateway
        .add_router_interface(router_id, &subnet.id)
        .await
        .with_context(|| format!("cannot connect '{}' to the router", app.name))?;
    undo.push(UndoAction::DetachSubnet {
        router_id: router_id.to_string(),
        subnet_id: subnet.id.clone(),
    });

    tracing::info!(
        application = %app.name,
        network = %network.id,
        subnet = %subnet.id,
        cidr = %app.plan.cidr,
        "network recreated"
    );
    Ok(Landing {
        network_id: network.id,
        subnet_id: subnet.id,
    })
}

struct RestoreContext<'a, G, S, R> {
    gateway: &'a G,
    store: &'a S,
    reporter: &'a R,
    undo: &'a UndoLog,
    app: &'a str,
    landing: &'a Landing,
    flavor_id: &'a str,
    security_groups: &'a [String],
    wait: &'a Backoff,
}

impl<G, S, R> RestoreContext<'_, G, S, R>
where
    G: ProviderGateway,
    S: ArtifactStore,
    R: ProgressReporter,
{
    async fn restore_service(&self, item: ServiceSnapshot) -> Result<RestoredService> {
        let service = &item.service;
        let name = service.name.as_str();
        let mut warnings = Vec::new();

        let path = item.artifact().ok_or_else(|| MigraError::NotAvailable {
            application: self.app.to_string(),
        })?;
        let image_id = self
            .upload(name, path, &item.disk_format, &item.container_format)
            .await
            .with_context(|| format!("cannot upload image of {service}"))?;

        let port_name = naming::port_name(self.app, name);
        let port = self
            .gateway
            .create_port(&PortSpec {
                name: &port_name,
                network_id: &self.landing.network_id,
                subnet_id: &self.landing.subnet_id,
                fixed_ip: Some(service.fixed_ip),
            })
            .await
            .with_context(|| format!("cannot create port for {service}"))?;
        self.undo.push(UndoAction::DeletePort {
            id: port.id.clone(),
            name: port_name,
        });

        let server_name = naming::server_name(self.app, name);
        self.reporter.step(&format!("booting {server_name}..."));
        let server_id = self
            .gateway
            .create_server(&ServerSpec {
                name: &server_name,
                image_id: &image_id,
                port_id: &port.id,
                flavor_id: self.flavor_id,
                security_groups: self.security_groups,
            })
            .await
            .with_context(|| format!("cannot create server for {service}"))?;
        self.undo.push(UndoAction::DeleteServer {
            id: server_id.clone(),
            name: server_name.clone(),
        });

        let gateway = self.gateway;
        let waited = await_condition(self.wait, || {
            server_probe(gateway, &server_id, &server_name)
        })
        .await;
        let active = match waited {
            Ok(_) => true,
            Err(e) if is_timeout(&e) => {
                let msg = format!("{server_name} is not active yet: {e}");
                tracing::warn!(server = %server_name, "server not active before the deadline");
                self.reporter.warn(&msg);
                warnings.push(msg);
                false
            }
            Err(e) => return Err(e.context(format!("server for {service} failed to start"))),
        };

        if active {
            let image_undo = UndoAction::DeleteImage {
                id: image_id.clone(),
                name: naming::image_name(self.app, name),
            };
            match self.gateway.delete_image(&image_id).await {
                Ok(()) => self.undo.retract(&image_undo),
                Err(e) => {
                    let msg = format!("cannot delete uploaded image of {name}: {e:#}");
                    tracing::warn!(image = %image_id, error = %format!("{e:#}"), "cannot delete uploaded image");
                    self.reporter.warn(&msg);
                    warnings.push(msg);
                }
            }
        }

        tracing::info!(application = self.app, service = name, ip = %service.fixed_ip, active, "service restored");
        Ok(RestoredService {
            name: name.to_string(),
            server_id,
            port_id: port.id,
            fixed_ip: service.fixed_ip,
            active,
            warnings,
        })
    }

    async fn upload(
        &self,
        service: &str,
        path: &Path,
        disk_format: &str,
        container_format: &str,
    ) -> Result<String> {
        let image_name = naming::image_name(self.app, service);
        self.reporter
            .step(&format!("uploading image {image_name}..."));
        let image = self
            .gateway
            .create_image(&ImageSpec {
                name: &image_name,
                disk_format,
                container_format,
            })
            .await?;
        self.undo.push(UndoAction::DeleteImage {
            id: image.id.clone(),
            name: image_name.clone(),
        });
        let (size, data) = self.store.open_artifact(path).await?;
        self.gateway.upload_image(&image.id, data).await?;
        tracing::info!(image = %image_name, bytes = size, "image uploaded");
        Ok(image.id)
    }
}

async fn server_probe(
    gateway: &impl ProviderGateway,
    server_id: &str,
    server_name: &str,
) -> Result<Probe> {
    let server = gateway.get_server(server_id).await?;
    let label = format!("server {server_name} ({})", server.status);
    match server.status {
        ServerStatus::Active => Ok(Probe::ready(label)),
        ServerStatus::Error => Err(MigraError::provider(format!("{label} failed to boot")).into()),
        ServerStatus::Build | ServerStatus::Other => Ok(Probe::pending(label)),
    }
}

fn is_timeout(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<MigraError>().map(MigraError::kind),
        Some(ErrorKind::Timeout)
    )
}
