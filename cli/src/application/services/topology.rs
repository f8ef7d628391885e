//! Application service: rebuild application topology from resource names.

use anyhow::{Context, Result};

use crate::application::ports::{NetworkFilter, ProviderGateway};
use crate::domain::naming::{self, validate_component};
use crate::domain::{
    AddressPlan, Application, COMPUTE_DEVICE_OWNER, MigraError, NetworkRecord, PortRecord,
    Service, SubnetRecord,
};

/// Look up application `app_name` on an installation.
///
/// # Errors
///
/// Returns `MigraError::NotFound` when its network or subnet does not exist,
/// `MigraError::Ambiguous` when either name is used more than once, and the
/// first failing lookup otherwise, wrapped with the service it concerned.
pub async fn resolve(gateway: &impl ProviderGateway, app_name: &str) -> Result<Application> {
    validate_component("application", app_name)?;
    let network = find_network(gateway, app_name).await?;
    let subnet = find_subnet(gateway, app_name, &network).await?;

    let ports = gateway
        .list_ports(&network.id, Some(COMPUTE_DEVICE_OWNER))
        .await
        .with_context(|| format!("cannot list ports of application '{app_name}'"))?;

    let mut services = Vec::with_capacity(ports.len());
    for port in ports {
        let Some(service_name) = naming::service_from_port(app_name, &port.name) else {
            tracing::warn!(
                application = app_name,
                port = %port.name,
                "skipping port that does not follow the naming convention"
            );
            continue;
        };
        let service = resolve_service(gateway, service_name, &subnet, &port)
            .await
            .with_context(|| format!("cannot get service '{service_name}' of '{app_name}'"))?;
        services.push(service);
    }

    tracing::debug!(application = app_name, services = services.len(), "resolved");
    Ok(Application {
        name: app_name.to_string(),
        network_id: network.id,
        subnet_id: subnet.id,
        plan: AddressPlan {
            cidr: subnet.cidr,
            dns_servers: subnet.dns_servers,
            ip_version: subnet.ip_version,
        },
        services,
    })
}

/// Resolve every application hosted on an installation.
///
/// Networks whose names do not end in the network suffix are skipped; the
/// first application that fails to resolve aborts the listing.
///
/// # Errors
///
/// Returns the network listing failure or the first resolution failure.
pub async fn list_all(gateway: &impl ProviderGateway) -> Result<Vec<Application>> {
    let networks = gateway
        .list_networks(NetworkFilter {
            name: None,
            external: Some(false),
        })
        .await
        .context("cannot list networks")?;

    let mut applications = Vec::new();
    for network in networks.iter().filter(|n| !n.external) {
        let Some(app_name) = naming::application_from_network(&network.name) else {
            tracing::debug!(network = %network.name, "not an application network");
            continue;
        };
        applications.push(resolve(gateway, app_name).await?);
    }
    Ok(applications)
}

async fn find_network(gateway: &impl ProviderGateway, app_name: &str) -> Result<NetworkRecord> {
    let name = naming::network_name(app_name);
    let mut found = gateway
        .list_networks(NetworkFilter {
            name: Some(&name),
            external: None,
        })
        .await
        .with_context(|| format!("cannot get application '{app_name}'"))?;
    found.retain(|n| n.name == name);
    match found.len() {
        0 => Err(MigraError::not_found(format!("network '{name}'")))
            .with_context(|| format!("cannot get application '{app_name}'")),
        1 => Ok(found.remove(0)),
        count => Err(MigraError::Ambiguous {
            kind: "network",
            name,
            count,
        }
        .into()),
    }
}

async fn find_subnet(
    gateway: &impl ProviderGateway,
    app_name: &str,
    network: &NetworkRecord,
) -> Result<SubnetRecord> {
    let name = naming::subnet_name(app_name);
    let mut matches = Vec::new();
    for id in &network.subnet_ids {
        let subnet = gateway
            .get_subnet(id)
            .await
            .with_context(|| format!("cannot get subnet {id} of '{app_name}'"))?;
        if subnet.name == name {
            matches.push(subnet);
        }
    }
    match matches.len() {
        0 => Err(MigraError::not_found(format!("subnet '{name}'")))
            .with_context(|| format!("cannot get application '{app_name}'")),
        1 => Ok(matches.remove(0)),
        count => Err(MigraError::Ambiguous {
            kind: "subnet",
            name,
            count,
        }
        .into()),
    }
}

async fn resolve_service(
    gateway: &impl ProviderGateway,
    service_name: &str,
    subnet: &SubnetRecord,
    port: &PortRecord,
) -> Result<Service> {
    let fixed_ip = port
        .fixed_ips
        .iter()
        .find(|ip| ip.subnet_id == subnet.id)
        .map(|ip| ip.address)
        .or_else(|| port.primary_address())
        .ok_or_else(|| {
            MigraError::provider(format!("port '{}' has no fixed IP address", port.name))
        })?;
    let server = gateway
        .get_server(&port.device_id)
        .await
        .with_context(|| format!("cannot get server of port '{}'", port.name))?;
    Ok(Service {
        name: service_name.to_string(),
        port_id: port.id.clone(),
        server_id: server.id,
        fixed_ip,
    })
}
