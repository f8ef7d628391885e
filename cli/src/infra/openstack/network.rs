//! Neutron: networks, subnets, router interfaces and ports.

use std::net::IpAddr;

use anyhow::Result;
use migra_common::network::{
    CreateNetwork, CreatePort, CreateSubnet, Network, NetworkEnvelope, NetworkList, Port,
    PortEnvelope, PortList, RequestedIp, RouterInterface, Subnet, SubnetEnvelope,
};

use super::OpenStackPlatform;
use crate::application::ports::{NetworkFilter, NetworkGateway, PortSpec, SubnetSpec};
use crate::domain::{MigraError, NetworkRecord, PortAddress, PortRecord, SubnetRecord};

impl OpenStackPlatform {
    fn network_endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.network_url)
    }
}

fn network_record(network: Network) -> NetworkRecord {
    NetworkRecord {
        id: network.id,
        name: network.name,
        subnet_ids: network.subnets,
        external: network.router_external,
    }
}

fn subnet_record(subnet: Subnet) -> SubnetRecord {
    SubnetRecord {
        id: subnet.id,
        name: subnet.name,
        network_id: subnet.network_id,
        cidr: subnet.cidr,
        ip_version: subnet.ip_version,
        dns_servers: subnet.dns_nameservers,
    }
}

fn port_record(port: Port) -> Result<PortRecord> {
    let fixed_ips = port
        .fixed_ips
        .into_iter()
        .map(|ip| -> Result<PortAddress> {
            let address = ip.ip_address.parse::<IpAddr>().map_err(|_| {
                MigraError::provider(format!(
                    "port {} has invalid address '{}'",
                    port.id, ip.ip_address
                ))
            })?;
            Ok(PortAddress {
                subnet_id: ip.subnet_id,
                address,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(PortRecord {
        id: port.id,
        name: port.name,
        network_id: port.network_id,
        device_id: port.device_id,
        device_owner: port.device_owner,
        fixed_ips,
    })
}

impl NetworkGateway for OpenStackPlatform {
    fn router_id(&self) -> Option<&str> {
        self.router_id.as_deref()
    }

    async fn create_network(&self, name: &str) -> Result<NetworkRecord> {
        let body = NetworkEnvelope {
            network: CreateNetwork {
                name,
                admin_state_up: true,
            },
        };
        let created: NetworkEnvelope<Network> = self
            .session
            .post(&self.network_endpoint("networks"), &body, "network")
            .await?;
        Ok(network_record(created.network))
    }

    async fn get_network(&self, id: &str) -> Result<NetworkRecord> {
        let found: NetworkEnvelope<Network> = self
            .session
            .get(
                &self.network_endpoint(&format!("networks/{id}")),
                &[],
                &format!("network {id}"),
            )
            .await?;
        Ok(network_record(found.network))
    }

    async fn list_networks(&self, filter: NetworkFilter<'_>) -> Result<Vec<NetworkRecord>> {
        let mut query = Vec::new();
        if let Some(name) = filter.name {
            query.push(("name", name));
        }
        if let Some(external) = filter.external {
            query.push(("router:external", if external { "true" } else { "false" }));
        }
        let list: NetworkList = self
            .session
            .get(&self.network_endpoint("networks"), &query, "networks")
            .await?;
        Ok(list.networks.into_iter().map(network_record).collect())
    }

    async fn delete_network(&self, id: &str) -> Result<()> {
        self.session
            .delete(
                &self.network_endpoint(&format!("networks/{id}")),
                &format!("network {id}"),
            )
            .await
    }

    async fn create_subnet(&self, spec: &SubnetSpec<'_>) -> Result<SubnetRecord> {
        let body = SubnetEnvelope {
            subnet: CreateSubnet {
                name: spec.name,
                network_id: spec.network_id,
                cidr: &spec.plan.cidr,
                ip_version: spec.plan.ip_version,
                dns_nameservers: &spec.plan.dns_servers,
            },
        };
        let created: SubnetEnvelope<Subnet> = self
            .session
            .post(&self.network_endpoint("subnets"), &body, "subnet")
            .await?;
        Ok(subnet_record(created.subnet))
    }

    async fn get_subnet(&self, id: &str) -> Result<SubnetRecord> {
        let found: SubnetEnvelope<Subnet> = self
            .session
            .get(
                &self.network_endpoint(&format!("subnets/{id}")),
                &[],
                &format!("subnet {id}"),
            )
            .await?;
        Ok(subnet_record(found.subnet))
    }

    async fn add_router_interface(&self, router_id: &str, subnet_id: &str) -> Result<()> {
        self.session
            .put(
                &self.network_endpoint(&format!("routers/{router_id}/add_router_interface")),
                &RouterInterface { subnet_id },
                &format!("router {router_id}"),
            )
            .await
    }

    async fn remove_router_interface(&self, router_id: &str, subnet_id: &str) -> Result<()> {
        self.session
            .put(
                &self.network_endpoint(&format!("routers/{router_id}/remove_router_interface")),
                &RouterInterface { subnet_id },
                &format!("interface of subnet {subnet_id} on router {router_id}"),
            )
            .await
    }

    async fn create_port(&self, spec: &PortSpec<'_>) -> Result<PortRecord> {
        let address = spec.fixed_ip.map(|ip| ip.to_string());
        let body = PortEnvelope {
            port: CreatePort {
                name: spec.name,
                network_id: spec.network_id,
                fixed_ips: vec![RequestedIp {
                    subnet_id: spec.subnet_id,
                    ip_address: address.as_deref(),
                }],
            },
        };
        let created: PortEnvelope<Port> = self
            .session
            .post(&self.network_endpoint("ports"), &body, "port")
            .await?;
        port_record(created.port)
    }

    async fn list_ports(
        &self,
        network_id: &str,
        device_owner: Option<&str>,
    ) -> Result<Vec<PortRecord>> {
        let mut query = vec![("network_id", network_id)];
        if let Some(owner) = device_owner {
            query.push(("device_owner", owner));
        }
        let list: PortList = self
            .session
            .get(&self.network_endpoint("ports"), &query, "ports")
            .await?;
        list.ports.into_iter().map(port_record).collect()
    }

    async fn get_port(&self, id: &str) -> Result<PortRecord> {
        let found: PortEnvelope<Port> = self
            .session
            .get(
                &self.network_endpoint(&format!("ports/{id}")),
                &[],
                &format!("port {id}"),
            )
            .await?;
        port_record(found.port)
    }

    async fn delete_port(&self, id: &str) -> Result<()> {
        self.session
            .delete(
                &self.network_endpoint(&format!("ports/{id}")),
                &format!("port {id}"),
            )
            .await
    }
}
