//! Platform resources as seen by the engine.
//!
//! Adapters translate provider payloads into these records so that the
//! application layer never touches wire types.

use std::fmt;
use std::net::IpAddr;

/// Device owner marking ports attached to compute instances.
pub const COMPUTE_DEVICE_OWNER: &str = "compute:nova";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkRecord {
    pub id: String,
    pub name: String,
    pub subnet_ids: Vec<String>,
    pub external: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetRecord {
    pub id: String,
    pub name: String,
    pub network_id: String,
    pub cidr: String,
    pub ip_version: u8,
    pub dns_servers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortAddress {
    pub subnet_id: String,
    pub address: IpAddr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortRecord {
    pub id: String,
    pub name: String,
    pub network_id: String,
    pub device_id: String,
    pub device_owner: String,
    pub fixed_ips: Vec<PortAddress>,
}

impl PortRecord {
    /// First fixed address of the port, if any.
    #[must_use]
    pub fn primary_address(&self) -> Option<IpAddr> {
        self.fixed_ips.first().map(|ip| ip.address)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerStatus {
    Active,
    Build,
    Error,
    Other,
}

impl ServerStatus {
    #[must_use]
    pub fn parse(status: &str) -> Self {
        match status.to_ascii_uppercase().as_str() {
            "ACTIVE" => Self::Active,
            "BUILD" => Self::Build,
            "ERROR" => Self::Error,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Active => "active",
            Self::Build => "build",
            Self::Error => "error",
            Self::Other => "other",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerRecord {
    pub id: String,
    pub name: String,
    pub status: ServerStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageStatus {
    Queued,
    Saving,
    Active,
    Killed,
    Deleted,
    Other,
}

impl ImageStatus {
    #[must_use]
    pub fn parse(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "queued" => Self::Queued,
            "saving" => Self::Saving,
            "active" => Self::Active,
            "killed" => Self::Killed,
            "deleted" | "pending_delete" => Self::Deleted,
            _ => Self::Other,
        }
    }

    /// The image will never become active.
    #[must_use]
    pub fn is_terminal_failure(self) -> bool {
        matches!(self, Self::Killed | Self::Deleted)
    }
}

impl fmt::Display for ImageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Queued => "queued",
            Self::Saving => "saving",
            Self::Active => "active",
            Self::Killed => "killed",
            Self::Deleted => "deleted",
            Self::Other => "other",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    pub id: String,
    pub name: String,
    pub status: ImageStatus,
    pub disk_format: Option<String>,
    pub container_format: Option<String>,
    pub size: Option<u64>,
}
