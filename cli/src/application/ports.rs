//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`, never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::net::IpAddr;
use std::path::{Path, PathBuf};

use anyhow::Result;
use bytes::Bytes;
use futures_util::stream::BoxStream;

use crate::domain::{
    AddressPlan, ImageRecord, MigraConfig, NetworkRecord, PortRecord, ServerRecord, SubnetRecord,
};

// ── Value Types ───────────────────────────────────────────────────────────────

/// Disk image bytes flowing between the image service and local storage.
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// Network listing filter. `None` fields do not filter.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkFilter<'a> {
    pub name: Option<&'a str>,
    pub external: Option<bool>,
}

pub struct SubnetSpec<'a> {
    pub name: &'a str,
    pub network_id: &'a str,
    pub plan: &'a AddressPlan,
}

pub struct PortSpec<'a> {
    pub name: &'a str,
    pub network_id: &'a str,
    pub subnet_id: &'a str,
    /// Address to request on `subnet_id`. The provider allocates one when `None`.
    pub fixed_ip: Option<IpAddr>,
}

pub struct ServerSpec<'a> {
    pub name: &'a str,
    pub image_id: &'a str,
    pub port_id: &'a str,
    pub flavor_id: &'a str,
    pub security_groups: &'a [String],
}

pub struct ImageSpec<'a> {
    pub name: &'a str,
    pub disk_format: &'a str,
    pub container_format: &'a str,
}

// ── Provider Gateway Ports ────────────────────────────────────────────────────

/// Networks, subnets, router interfaces and ports of one installation.
#[allow(async_fn_in_trait)]
pub trait NetworkGateway {
    /// Router that application subnets attach to, if the project has one.
    fn router_id(&self) -> Option<&str>;

    async fn create_network(&self, name: &str) -> Result<NetworkRecord>;
    async fn get_network(&self, id: &str) -> Result<NetworkRecord>;
    async fn list_networks(&self, filter: NetworkFilter<'_>) -> Result<Vec<NetworkRecord>>;
    async fn delete_network(&self, id: &str) -> Result<()>;

    async fn create_subnet(&self, spec: &SubnetSpec<'_>) -> Result<SubnetRecord>;
    async fn get_subnet(&self, id: &str) -> Result<SubnetRecord>;

    async fn add_router_interface(&self, router_id: &str, subnet_id: &str) -> Result<()>;
    async fn remove_router_interface(&self, router_id: &str, subnet_id: &str) -> Result<()>;

    async fn create_port(&self, spec: &PortSpec<'_>) -> Result<PortRecord>;
    /// List the ports of a network, only those owned by `device_owner` when given.
    async fn list_ports(
        &self,
        network_id: &str,
        device_owner: Option<&str>,
    ) -> Result<Vec<PortRecord>>;
    async fn get_port(&self, id: &str) -> Result<PortRecord>;
    async fn delete_port(&self, id: &str) -> Result<()>;
}

/// Servers and flavors.
#[allow(async_fn_in_trait)]
pub trait ComputeGateway {
    /// Boot a server and return its id.
    async fn create_server(&self, spec: &ServerSpec<'_>) -> Result<String>;
    async fn get_server(&self, id: &str) -> Result<ServerRecord>;
    async fn delete_server(&self, id: &str) -> Result<()>;
    /// Ask the compute service to snapshot a server into a new image.
    /// Returns the image id.
    async fn create_server_image(&self, server_id: &str, image_name: &str) -> Result<String>;
    /// Look a flavor up by name.
    async fn find_flavor(&self, name: &str) -> Result<Option<String>>;
}

/// Image records and their data.
#[allow(async_fn_in_trait)]
pub trait ImageGateway {
    async fn create_image(&self, spec: &ImageSpec<'_>) -> Result<ImageRecord>;
    async fn get_image(&self, id: &str) -> Result<ImageRecord>;
    async fn upload_image(&self, id: &str, data: ByteStream) -> Result<()>;
    async fn download_image(&self, id: &str) -> Result<ByteStream>;
    async fn delete_image(&self, id: &str) -> Result<()>;
}

/// Composite trait: everything the engine needs from one installation.
pub trait ProviderGateway: NetworkGateway + ComputeGateway + ImageGateway {}

/// Blanket implementation: any type implementing all three sub-traits is a
/// `ProviderGateway`.
impl<T> ProviderGateway for T where T: NetworkGateway + ComputeGateway + ImageGateway {}

// ── Local Storage Port ────────────────────────────────────────────────────────

/// Local snapshot directories and the artifacts inside them.
#[allow(async_fn_in_trait)]
pub trait ArtifactStore {
    /// Create a fresh, uniquely named directory for a snapshot of `application`.
    async fn create_snapshot_dir(&self, application: &str) -> Result<PathBuf>;
    /// Write `data` to `path`, returning the number of bytes written.
    async fn write_artifact(&self, path: &Path, data: ByteStream) -> Result<u64>;
    /// Open an artifact for reading. Returns its size and its bytes.
    async fn open_artifact(&self, path: &Path) -> Result<(u64, ByteStream)>;
    async fn exists(&self, path: &Path) -> bool;
    /// Delete a file. A missing file is not an error.
    async fn remove_file(&self, path: &Path) -> Result<()>;
    /// Delete a directory and its contents. A missing directory is not an error.
    async fn remove_dir(&self, path: &Path) -> Result<()>;
    async fn write_file(&self, path: &Path, contents: &[u8]) -> Result<()>;
    async fn read_to_string(&self, path: &Path) -> Result<String>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}

// ── Configuration Port ────────────────────────────────────────────────────────

/// Abstracts loading and saving of the user configuration.
pub trait ConfigStore {
    /// Load the configuration, falling back to defaults when none is saved.
    fn load(&self) -> Result<MigraConfig>;
    fn save(&self, config: &MigraConfig) -> Result<()>;
    /// Location of the configuration file.
    fn path(&self) -> Result<PathBuf>;
}
