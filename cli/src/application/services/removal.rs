//! Application service: remove an application from an installation.

use anyhow::{Context, Result};

use crate::application::ports::{ComputeGateway, ProgressReporter, ProviderGateway};
use crate::application::services::backoff::{Backoff, Probe, await_condition};
use crate::application::services::topology::resolve;
use crate::domain::naming;
use crate::domain::{ErrorKind, MigraError, error_kind};

/// Delete the servers, ports, router attachment and network of `app_name`.
///
/// Each server is waited on until it is gone before its port is released.
/// Nothing already deleted is recreated when a later step fails, and a
/// resource that has vanished in the meantime counts as deleted, so a failed
/// removal can be run again to finish the job. Ports of the application left
/// unbound by an earlier run are swept before the network goes.
///
/// # Errors
///
/// Returns `MigraError::NotFound` when the application does not exist, or a
/// provider error wrapped with the resource it targeted. A server that is
/// still not gone when the wait runs out is reported as a provider error.
pub async fn remove(
    gateway: &impl ProviderGateway,
    reporter: &impl ProgressReporter,
    app_name: &str,
    server_wait: &Backoff,
) -> Result<()> {
    let app = resolve(gateway, app_name).await?;
    let router_id = gateway.router_id().ok_or_else(|| {
        MigraError::provider(format!(
            "no router to detach application '{app_name}' from"
        ))
    })?;

    reporter.step(&format!("detaching {app_name} from router..."));
    already_gone(
        gateway
            .remove_router_interface(router_id, &app.subnet_id)
            .await,
    )
    .with_context(|| format!("cannot remove router connection for '{app_name}'"))?;

    for service in &app.services {
        reporter.step(&format!("removing {service}..."));
        already_gone(gateway.delete_server(&service.server_id).await)
            .with_context(|| format!("cannot remove server for {service}"))?;
        wait_server_gone(gateway, &service.server_id, &service.name, server_wait)
            .await
            .map_err(|e| MigraError::provider(format!("{e:#}")))
            .with_context(|| format!("cannot remove server for {service}"))?;
        already_gone(gateway.delete_port(&service.port_id).await)
            .with_context(|| format!("cannot remove port for {service}"))?;
        tracing::info!(application = app_name, service = %service.name, "service removed");
    }

    let leftovers = gateway
        .list_ports(&app.network_id, None)
        .await
        .with_context(|| format!("cannot list ports of application '{app_name}'"))?;
    for port in leftovers
        .iter()
        .filter(|p| naming::service_from_port(app_name, &p.name).is_some())
    {
        tracing::info!(application = app_name, port = %port.name, "removing leftover port");
        already_gone(gateway.delete_port(&port.id).await)
            .with_context(|| format!("cannot remove leftover port '{}'", port.name))?;
    }

    gateway
        .delete_network(&app.network_id)
        .await
        .with_context(|| format!("cannot remove network for '{app_name}'"))?;
    reporter.success(&format!("application {app_name} removed"));
    Ok(())
}

/// Treat a deletion whose target no longer exists as done.
fn already_gone(result: Result<()>) -> Result<()> {
    match result {
        Err(e) if error_kind(&e) == ErrorKind::NotFound => {
            tracing::debug!(error = %format!("{e:#}"), "already deleted");
            Ok(())
        }
        other => other,
    }
}

/// Poll a deleted server until the provider no longer knows it.
pub(crate) async fn wait_server_gone(
    gateway: &impl ComputeGateway,
    server_id: &str,
    label: &str,
    wait: &Backoff,
) -> Result<u32> {
    await_condition(wait, || async move {
        match gateway.get_server(server_id).await {
            Ok(server) => Ok(Probe::pending(format!(
                "deletion of server {label} ({})",
                server.status
            ))),
            Err(e) if error_kind(&e) == ErrorKind::NotFound => {
                Ok(Probe::ready(format!("deletion of server {label}")))
            }
            Err(e) => Err(e),
        }
    })
    .await
}
