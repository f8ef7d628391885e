//! Application topology: one private network, one subnet, many services.

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// Addressing plan of an application's subnet, copied verbatim on restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressPlan {
    pub cidr: String,
    #[serde(default)]
    pub dns_servers: Vec<String>,
    pub ip_version: u8,
}

/// A set of virtual machines sharing one private network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub name: String,
    pub network_id: String,
    pub subnet_id: String,
    pub plan: AddressPlan,
    pub services: Vec<Service>,
}

/// One virtual machine of an application and the port that attaches it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    pub port_id: String,
    pub server_id: String,
    pub fixed_ip: IpAddr,
}

impl Application {
    #[must_use]
    pub fn service_names(&self) -> Vec<&str> {
        self.services.iter().map(|s| s.name.as_str()).collect()
    }
}

impl fmt::Display for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "application '{}' with [", self.name)?;
        for (i, service) in self.services.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{service}")?;
        }
        f.write_str("]")
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "service '{}' ({})", self.name, self.fixed_ip)
    }
}
