//! Neutron v2.0 resources: networks, subnets, ports and routers.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub subnets: Vec<String>,
    #[serde(rename = "router:external", default)]
    pub router_external: bool,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subnet {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub network_id: String,
    pub cidr: String,
    pub ip_version: u8,
    #[serde(default)]
    pub dns_nameservers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FixedIp {
    pub subnet_id: String,
    pub ip_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Port {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub network_id: String,
    #[serde(default)]
    pub fixed_ips: Vec<FixedIp>,
    #[serde(default)]
    pub device_id: String,
    #[serde(default)]
    pub device_owner: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Router {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct CreateNetwork<'a> {
    pub name: &'a str,
    pub admin_state_up: bool,
}

#[derive(Debug, Serialize)]
pub struct CreateSubnet<'a> {
    pub name: &'a str,
    pub network_id: &'a str,
    pub cidr: &'a str,
    pub ip_version: u8,
    pub dns_nameservers: &'a [String],
}

/// Fixed IP requested at port creation. The address is optional so that
/// Neutron can allocate one when none is asked for.
#[derive(Debug, Serialize)]
pub struct RequestedIp<'a> {
    pub subnet_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct CreatePort<'a> {
    pub name: &'a str,
    pub network_id: &'a str,
    pub fixed_ips: Vec<RequestedIp<'a>>,
}

/// Body of `PUT /v2.0/routers/{id}/add_router_interface` and its removal
/// counterpart.
#[derive(Debug, Serialize)]
pub struct RouterInterface<'a> {
    pub subnet_id: &'a str,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NetworkEnvelope<T> {
    pub network: T,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubnetEnvelope<T> {
    pub subnet: T,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PortEnvelope<T> {
    pub port: T,
}

#[derive(Debug, Deserialize)]
pub struct NetworkList {
    #[serde(default)]
    pub networks: Vec<Network>,
}

#[derive(Debug, Deserialize)]
pub struct PortList {
    #[serde(default)]
    pub ports: Vec<Port>,
}

#[derive(Debug, Deserialize)]
pub struct RouterList {
    #[serde(default)]
    pub routers: Vec<Router>,
}
