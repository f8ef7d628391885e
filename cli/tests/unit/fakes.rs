//! In-memory installation and artifact store for engine tests.
//!
//! `InMemoryCloud` behaves like a small OpenStack project: ports get bound
//! when a server boots on them, networks refuse deletion while ports or
//! router interfaces remain, and images or servers become active only after
//! a configurable number of status polls.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Result, bail};
use bytes::Bytes;
use futures_util::{StreamExt, TryStreamExt, stream};

use migra_cli::application::ports::{
    ArtifactStore, ByteStream, ComputeGateway, ImageGateway, ImageSpec, NetworkFilter,
    NetworkGateway, PortSpec, ProgressReporter, ServerSpec, SubnetSpec,
};
use migra_cli::domain::{
    COMPUTE_DEVICE_OWNER, ImageRecord, ImageStatus, MigraError, NetworkRecord, PortAddress,
    PortRecord, ServerRecord, ServerStatus, SubnetRecord,
};

/// Polls after which a resource never becomes ready.
pub const NEVER: u32 = u32::MAX;

// ── Cloud ─────────────────────────────────────────────────────────────────────

struct FakeServer {
    name: String,
    port_id: String,
    disk: Vec<u8>,
    disk_format: String,
    status: ServerStatus,
    polls_left: u32,
}

struct FakeImage {
    record: ImageRecord,
    data: Vec<u8>,
    polls_left: u32,
}

#[derive(Default)]
struct CloudState {
    next_id: u64,
    networks: BTreeMap<String, NetworkRecord>,
    subnets: BTreeMap<String, SubnetRecord>,
    interfaces: BTreeSet<(String, String)>,
    ports: BTreeMap<String, PortRecord>,
    servers: BTreeMap<String, FakeServer>,
    images: BTreeMap<String, FakeImage>,
    flavors: Vec<(String, String)>,
    log: Vec<String>,
    fail_on: Vec<String>,
}

impl CloudState {
    fn id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    /// Log `entry` and fail when it matches an injected failure.
    fn call(&mut self, entry: String) -> Result<()> {
        let failing = self.fail_on.iter().any(|f| entry.starts_with(f.as_str()));
        self.log.push(entry.clone());
        if failing {
            bail!(MigraError::Provider {
                status: Some(500),
                message: format!("{entry} refused"),
            });
        }
        Ok(())
    }
}

/// One service of a seeded application: name, address and disk content.
pub struct SeedService<'a> {
    pub name: &'a str,
    pub ip: &'a str,
    pub disk: &'a [u8],
}

pub struct InMemoryCloud {
    state: Mutex<CloudState>,
    router: Option<String>,
    image_polls: u32,
    server_polls: u32,
    stuck_deletes: bool,
}

impl Default for InMemoryCloud {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCloud {
    /// A project with router `router-1` and flavor `m1.tiny`. Images and
    /// servers are ready on their second status poll.
    pub fn new() -> Self {
        let state = CloudState {
            flavors: vec![("flavor-1".into(), "m1.tiny".into())],
            ..CloudState::default()
        };
        Self {
            state: Mutex::new(state),
            router: Some("router-1".into()),
            image_polls: 1,
            server_polls: 1,
            stuck_deletes: false,
        }
    }

    pub fn without_router(mut self) -> Self {
        self.router = None;
        self
    }

    /// Pending polls before captured images become active.
    pub fn image_polls(mut self, polls: u32) -> Self {
        self.image_polls = polls;
        self
    }

    /// Pending polls before booted servers become active.
    pub fn server_polls(mut self, polls: u32) -> Self {
        self.server_polls = polls;
        self
    }

    /// Accept server deletions but keep reporting the servers.
    pub fn stuck_deletes(mut self) -> Self {
        self.stuck_deletes = true;
        self
    }

    /// Fail every call whose log entry starts with `prefix`
    /// (e.g. `"create_server carpidbvm"`).
    pub fn fail_on(&self, prefix: &str) {
        self.state.lock().unwrap().fail_on.push(prefix.to_string());
    }

    pub fn clear_faults(&self) {
        self.state.lock().unwrap().fail_on.clear();
    }

    pub fn log(&self) -> Vec<String> {
        self.state.lock().unwrap().log.clone()
    }

    /// Seed an application the way operators lay one out.
    pub fn seed_application(&self, app: &str, cidr: &str, dns: &[&str], services: &[SeedService<'_>]) {
        let mut st = self.state.lock().unwrap();
        let network_id = st.id("net");
        let subnet_id = st.id("subnet");
        st.networks.insert(
            network_id.clone(),
            NetworkRecord {
                id: network_id.clone(),
                name: format!("{app}net"),
                subnet_ids: vec![subnet_id.clone()],
                external: false,
            },
        );
        st.subnets.insert(
            subnet_id.clone(),
            SubnetRecord {
                id: subnet_id.clone(),
                name: format!("{app}subnet"),
                network_id: network_id.clone(),
                cidr: cidr.to_string(),
                ip_version: 4,
                dns_servers: dns.iter().map(ToString::to_string).collect(),
            },
        );
        if let Some(router) = &self.router {
            st.interfaces.insert((router.clone(), subnet_id.clone()));
        }
        for svc in services {
            let port_id = st.id("port");
            let server_id = st.id("vm");
            st.ports.insert(
                port_id.clone(),
                PortRecord {
                    id: port_id.clone(),
                    name: format!("{app}{}port", svc.name),
                    network_id: network_id.clone(),
                    device_id: server_id.clone(),
                    device_owner: COMPUTE_DEVICE_OWNER.into(),
                    fixed_ips: vec![PortAddress {
                        subnet_id: subnet_id.clone(),
                        address: svc.ip.parse().unwrap(),
                    }],
                },
            );
            st.servers.insert(
                server_id,
                FakeServer {
                    name: format!("{app}{}vm", svc.name),
                    port_id,
                    disk: svc.disk.to_vec(),
                    disk_format: "qcow2".into(),
                    status: ServerStatus::Active,
                    polls_left: 0,
                },
            );
        }
    }

    /// Add a second subnet called `name` to the network named `network`.
    pub fn add_subnet(&self, network: &str, name: &str, cidr: &str) {
        let mut st = self.state.lock().unwrap();
        let subnet_id = st.id("subnet");
        let net = st
            .networks
            .values_mut()
            .find(|n| n.name == network)
            .expect("seeded network");
        net.subnet_ids.push(subnet_id.clone());
        let network_id = net.id.clone();
        st.subnets.insert(
            subnet_id.clone(),
            SubnetRecord {
                id: subnet_id,
                name: name.to_string(),
                network_id,
                cidr: cidr.to_string(),
                ip_version: 4,
                dns_servers: Vec::new(),
            },
        );
    }

    pub fn add_external_network(&self, name: &str) {
        let mut st = self.state.lock().unwrap();
        let id = st.id("ext");
        st.networks.insert(
            id.clone(),
            NetworkRecord {
                id,
                name: name.to_string(),
                subnet_ids: Vec::new(),
                external: true,
            },
        );
    }

    pub fn network_names(&self) -> Vec<String> {
        let st = self.state.lock().unwrap();
        st.networks.values().map(|n| n.name.clone()).collect()
    }

    pub fn resource_counts(&self) -> (usize, usize, usize, usize) {
        let st = self.state.lock().unwrap();
        (st.networks.len(), st.ports.len(), st.servers.len(), st.images.len())
    }

    pub fn interface_count(&self) -> usize {
        self.state.lock().unwrap().interfaces.len()
    }

    /// Disk content and format of the server called `name`.
    pub fn server_disk(&self, name: &str) -> Option<(Vec<u8>, String)> {
        let st = self.state.lock().unwrap();
        st.servers
            .values()
            .find(|s| s.name == name)
            .map(|s| (s.disk.clone(), s.disk_format.clone()))
    }

    pub fn port_address(&self, name: &str) -> Option<IpAddr> {
        let st = self.state.lock().unwrap();
        st.ports
            .values()
            .find(|p| p.name == name)
            .and_then(PortRecord::primary_address)
    }
}

fn not_found(what: String) -> anyhow::Error {
    MigraError::not_found(what).into()
}

impl NetworkGateway for InMemoryCloud {
    fn router_id(&self) -> Option<&str> {
        self.router.as_deref()
    }

    async fn create_network(&self, name: &str) -> Result<NetworkRecord> {
        let mut st = self.state.lock().unwrap();
        st.call(format!("create_network {name}"))?;
        let id = st.id("net");
        let record = NetworkRecord {
            id: id.clone(),
            name: name.to_string(),
            subnet_ids: Vec::new(),
            external: false,
        };
        st.networks.insert(id, record.clone());
        Ok(record)
    }

    async fn get_network(&self, id: &str) -> Result<NetworkRecord> {
        let mut st = self.state.lock().unwrap();
        st.call(format!("get_network {id}"))?;
        st.networks
            .get(id)
            .cloned()
            .ok_or_else(|| not_found(format!("network {id}")))
    }

    async fn list_networks(&self, filter: NetworkFilter<'_>) -> Result<Vec<NetworkRecord>> {
        let mut st = self.state.lock().unwrap();
        st.call(format!("list_networks {}", filter.name.unwrap_or("*")))?;
        Ok(st
            .networks
            .values()
            .filter(|n| filter.name.is_none_or(|name| n.name == name))
            .filter(|n| filter.external.is_none_or(|ext| n.external == ext))
            .cloned()
            .collect())
    }

    async fn delete_network(&self, id: &str) -> Result<()> {
        let mut st = self.state.lock().unwrap();
        st.call(format!("delete_network {id}"))?;
        let Some(network) = st.networks.get(id).cloned() else {
            return Err(not_found(format!("network {id}")));
        };
        let in_use = st.ports.values().any(|p| p.network_id == id)
            || st
                .interfaces
                .iter()
                .any(|(_, subnet)| network.subnet_ids.contains(subnet));
        if in_use {
            bail!(MigraError::Provider {
                status: Some(409),
                message: format!("Network {id} is in use."),
            });
        }
        for subnet in &network.subnet_ids {
            st.subnets.remove(subnet);
        }
        st.networks.remove(id);
        Ok(())
    }

    async fn create_subnet(&self, spec: &SubnetSpec<'_>) -> Result<SubnetRecord> {
        let mut st = self.state.lock().unwrap();
        st.call(format!("create_subnet {}", spec.name))?;
        let id = st.id("subnet");
        let record = SubnetRecord {
            id: id.clone(),
            name: spec.name.to_string(),
            network_id: spec.network_id.to_string(),
            cidr: spec.plan.cidr.clone(),
            ip_version: spec.plan.ip_version,
            dns_servers: spec.plan.dns_servers.clone(),
        };
        let Some(network) = st.networks.get_mut(spec.network_id) else {
            return Err(not_found(format!("network {}", spec.network_id)));
        };
        network.subnet_ids.push(id.clone());
        st.subnets.insert(id, record.clone());
        Ok(record)
    }

    async fn get_subnet(&self, id: &str) -> Result<SubnetRecord> {
        let mut st = self.state.lock().unwrap();
        st.call(format!("get_subnet {id}"))?;
        st.subnets
            .get(id)
            .cloned()
            .ok_or_else(|| not_found(format!("subnet {id}")))
    }

    async fn add_router_interface(&self, router_id: &str, subnet_id: &str) -> Result<()> {
        let mut st = self.state.lock().unwrap();
        st.call(format!("add_router_interface {subnet_id}"))?;
        st.interfaces
            .insert((router_id.to_string(), subnet_id.to_string()));
        Ok(())
    }

    async fn remove_router_interface(&self, router_id: &str, subnet_id: &str) -> Result<()> {
        let mut st = self.state.lock().unwrap();
        st.call(format!("remove_router_interface {subnet_id}"))?;
        if !st
            .interfaces
            .remove(&(router_id.to_string(), subnet_id.to_string()))
        {
            return Err(not_found(format!("interface of subnet {subnet_id}")));
        }
        Ok(())
    }

    async fn create_port(&self, spec: &PortSpec<'_>) -> Result<PortRecord> {
        let mut st = self.state.lock().unwrap();
        st.call(format!("create_port {}", spec.name))?;
        let address = spec.fixed_ip.expect("engine always requests an address");
        let taken = st.ports.values().any(|p| {
            p.network_id == spec.network_id && p.fixed_ips.iter().any(|ip| ip.address == address)
        });
        if taken {
            bail!(MigraError::Provider {
                status: Some(409),
                message: format!("IP address {address} already allocated"),
            });
        }
        let id = st.id("port");
        let record = PortRecord {
            id: id.clone(),
            name: spec.name.to_string(),
            network_id: spec.network_id.to_string(),
            device_id: String::new(),
            device_owner: String::new(),
            fixed_ips: vec![PortAddress {
                subnet_id: spec.subnet_id.to_string(),
                address,
            }],
        };
        st.ports.insert(id, record.clone());
        Ok(record)
    }

    async fn list_ports(
        &self,
        network_id: &str,
        device_owner: Option<&str>,
    ) -> Result<Vec<PortRecord>> {
        let mut st = self.state.lock().unwrap();
        st.call(format!("list_ports {network_id}"))?;
        Ok(st
            .ports
            .values()
            .filter(|p| p.network_id == network_id)
            .filter(|p| device_owner.is_none_or(|owner| p.device_owner == owner))
            .cloned()
            .collect())
    }

    async fn get_port(&self, id: &str) -> Result<PortRecord> {
        let mut st = self.state.lock().unwrap();
        st.call(format!("get_port {id}"))?;
        st.ports
            .get(id)
            .cloned()
            .ok_or_else(|| not_found(format!("port {id}")))
    }

    async fn delete_port(&self, id: &str) -> Result<()> {
        let mut st = self.state.lock().unwrap();
        st.call(format!("delete_port {id}"))?;
        st.ports
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found(format!("port {id}")))
    }
}

impl ComputeGateway for InMemoryCloud {
    async fn create_server(&self, spec: &ServerSpec<'_>) -> Result<String> {
        // Let concurrently booting services interleave.
        tokio::task::yield_now().await;
        let mut st = self.state.lock().unwrap();
        st.call(format!("create_server {}", spec.name))?;
        if !st.flavors.iter().any(|(id, _)| id == spec.flavor_id) {
            return Err(not_found(format!("flavor {}", spec.flavor_id)));
        }
        let Some(image) = st.images.get(spec.image_id) else {
            return Err(not_found(format!("image {}", spec.image_id)));
        };
        let disk = image.data.clone();
        let disk_format = image.record.disk_format.clone().unwrap_or_default();
        let id = st.id("vm");
        let Some(port) = st.ports.get_mut(spec.port_id) else {
            return Err(not_found(format!("port {}", spec.port_id)));
        };
        port.device_id.clone_from(&id);
        port.device_owner = COMPUTE_DEVICE_OWNER.into();
        st.servers.insert(
            id.clone(),
            FakeServer {
                name: spec.name.to_string(),
                port_id: spec.port_id.to_string(),
                disk,
                disk_format,
                status: ServerStatus::Build,
                polls_left: self.server_polls,
            },
        );
        Ok(id)
    }

    async fn get_server(&self, id: &str) -> Result<ServerRecord> {
        let mut st = self.state.lock().unwrap();
        st.call(format!("get_server {id}"))?;
        let Some(server) = st.servers.get_mut(id) else {
            return Err(not_found(format!("server {id}")));
        };
        if server.status == ServerStatus::Build {
            if server.polls_left == 0 {
                server.status = ServerStatus::Active;
            } else if server.polls_left != NEVER {
                server.polls_left -= 1;
            }
        }
        Ok(ServerRecord {
            id: id.to_string(),
            name: server.name.clone(),
            status: server.status,
        })
    }

    async fn delete_server(&self, id: &str) -> Result<()> {
        let mut st = self.state.lock().unwrap();
        st.call(format!("delete_server {id}"))?;
        let Some(port_id) = st.servers.get(id).map(|s| s.port_id.clone()) else {
            return Err(not_found(format!("server {id}")));
        };
        if !self.stuck_deletes {
            st.servers.remove(id);
        }
        if let Some(port) = st.ports.get_mut(&port_id) {
            port.device_id.clear();
            port.device_owner.clear();
        }
        Ok(())
    }

    async fn create_server_image(&self, server_id: &str, image_name: &str) -> Result<String> {
        let mut st = self.state.lock().unwrap();
        st.call(format!("create_server_image {image_name}"))?;
        let Some(server) = st.servers.get(server_id) else {
            return Err(not_found(format!("server {server_id}")));
        };
        let data = server.disk.clone();
        let disk_format = server.disk_format.clone();
        let id = st.id("img");
        st.images.insert(
            id.clone(),
            FakeImage {
                record: ImageRecord {
                    id: id.clone(),
                    name: image_name.to_string(),
                    status: ImageStatus::Saving,
                    disk_format: Some(disk_format),
                    container_format: Some("bare".into()),
                    size: None,
                },
                data,
                polls_left: self.image_polls,
            },
        );
        Ok(id)
    }

    async fn find_flavor(&self, name: &str) -> Result<Option<String>> {
        let mut st = self.state.lock().unwrap();
        st.call(format!("find_flavor {name}"))?;
        Ok(st
            .flavors
            .iter()
            .find(|(_, n)| n == name)
            .map(|(id, _)| id.clone()))
    }
}

impl ImageGateway for InMemoryCloud {
    async fn create_image(&self, spec: &ImageSpec<'_>) -> Result<ImageRecord> {
        let mut st = self.state.lock().unwrap();
        st.call(format!("create_image {}", spec.name))?;
        let id = st.id("img");
        let record = ImageRecord {
            id: id.clone(),
            name: spec.name.to_string(),
            status: ImageStatus::Queued,
            disk_format: Some(spec.disk_format.to_string()),
            container_format: Some(spec.container_format.to_string()),
            size: None,
        };
        st.images.insert(
            id,
            FakeImage {
                record: record.clone(),
                data: Vec::new(),
                polls_left: 0,
            },
        );
        Ok(record)
    }

    async fn get_image(&self, id: &str) -> Result<ImageRecord> {
        let mut st = self.state.lock().unwrap();
        st.call(format!("get_image {id}"))?;
        let Some(image) = st.images.get_mut(id) else {
            return Err(not_found(format!("image {id}")));
        };
        if image.record.status == ImageStatus::Saving {
            if image.polls_left == 0 {
                image.record.status = ImageStatus::Active;
                image.record.size = Some(image.data.len() as u64);
            } else if image.polls_left != NEVER {
                image.polls_left -= 1;
            }
        }
        Ok(image.record.clone())
    }

    async fn upload_image(&self, id: &str, data: ByteStream) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .call(format!("upload_image {id}"))?;
        let chunks: Vec<Bytes> = data.try_collect().await?;
        let mut st = self.state.lock().unwrap();
        let Some(image) = st.images.get_mut(id) else {
            return Err(not_found(format!("image {id}")));
        };
        image.data = chunks.concat();
        image.record.status = ImageStatus::Active;
        image.record.size = Some(image.data.len() as u64);
        Ok(())
    }

    async fn download_image(&self, id: &str) -> Result<ByteStream> {
        let mut st = self.state.lock().unwrap();
        st.call(format!("download_image {id}"))?;
        let Some(image) = st.images.get(id) else {
            return Err(not_found(format!("image {id}")));
        };
        let data = image.data.clone();
        let chunks: Vec<Result<Bytes>> = data
            .chunks(4)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        Ok(stream::iter(chunks).boxed())
    }

    async fn delete_image(&self, id: &str) -> Result<()> {
        let mut st = self.state.lock().unwrap();
        st.call(format!("delete_image {id}"))?;
        st.images
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found(format!("image {id}")))
    }
}

// ── Artifact store ────────────────────────────────────────────────────────────

#[derive(Default)]
struct StoreState {
    next_dir: u32,
    dirs: BTreeSet<PathBuf>,
    files: BTreeMap<PathBuf, Vec<u8>>,
}

/// Snapshot directories kept in memory under `/snapshots`.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    pub fn file_count(&self) -> usize {
        self.state.lock().unwrap().files.len()
    }

    pub fn dir_count(&self) -> usize {
        self.state.lock().unwrap().dirs.len()
    }

    pub fn delete(&self, path: &Path) {
        self.state.lock().unwrap().files.remove(path);
    }

    /// Copy every file of `from` into `to`.
    pub fn copy_dir(&self, from: &Path, to: &Path) {
        let mut st = self.state.lock().unwrap();
        let copies: Vec<(PathBuf, Vec<u8>)> = st
            .files
            .iter()
            .filter_map(|(path, data)| {
                let rel = path.strip_prefix(from).ok()?;
                Some((to.join(rel), data.clone()))
            })
            .collect();
        st.dirs.insert(to.to_path_buf());
        st.files.extend(copies);
    }
}

impl ArtifactStore for MemoryStore {
    async fn create_snapshot_dir(&self, application: &str) -> Result<PathBuf> {
        let mut st = self.state.lock().unwrap();
        st.next_dir += 1;
        let dir = PathBuf::from(format!("/snapshots/migra-snap-{application}-{}", st.next_dir));
        st.dirs.insert(dir.clone());
        Ok(dir)
    }

    async fn write_artifact(&self, path: &Path, data: ByteStream) -> Result<u64> {
        let chunks: Vec<Bytes> = data.try_collect().await?;
        let bytes = chunks.concat();
        let len = bytes.len() as u64;
        self.state
            .lock()
            .unwrap()
            .files
            .insert(path.to_path_buf(), bytes);
        Ok(len)
    }

    async fn open_artifact(&self, path: &Path) -> Result<(u64, ByteStream)> {
        let st = self.state.lock().unwrap();
        let Some(data) = st.files.get(path) else {
            bail!("{} does not exist", path.display());
        };
        let size = data.len() as u64;
        let chunk = Bytes::copy_from_slice(data);
        Ok((size, stream::iter(vec![anyhow::Ok(chunk)]).boxed()))
    }

    async fn exists(&self, path: &Path) -> bool {
        self.state.lock().unwrap().files.contains_key(path)
    }

    async fn remove_file(&self, path: &Path) -> Result<()> {
        self.state.lock().unwrap().files.remove(path);
        Ok(())
    }

    async fn remove_dir(&self, path: &Path) -> Result<()> {
        let mut st = self.state.lock().unwrap();
        st.files.retain(|file, _| !file.starts_with(path));
        st.dirs.remove(path);
        Ok(())
    }

    async fn write_file(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .files
            .insert(path.to_path_buf(), contents.to_vec());
        Ok(())
    }

    async fn read_to_string(&self, path: &Path) -> Result<String> {
        let st = self.state.lock().unwrap();
        let Some(data) = st.files.get(path) else {
            bail!("{} does not exist", path.display());
        };
        Ok(String::from_utf8(data.clone())?)
    }
}

// ── Reporter ─────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingReporter {
    warnings: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().unwrap().clone()
    }
}

impl ProgressReporter for RecordingReporter {
    fn step(&self, _message: &str) {}
    fn success(&self, _message: &str) {}
    fn warn(&self, message: &str) {
        self.warnings.lock().unwrap().push(message.to_string());
    }
}

/// The `carpi` application: web and db on 10.0.0.0/24 with DNS 8.8.8.8.
pub fn carpi_source() -> InMemoryCloud {
    let cloud = InMemoryCloud::new();
    cloud.seed_application(
        "carpi",
        "10.0.0.0/24",
        &["8.8.8.8"],
        &[
            SeedService {
                name: "web",
                ip: "10.0.0.5",
                disk: b"web-disk-contents",
            },
            SeedService {
                name: "db",
                ip: "10.0.0.6",
                disk: b"db-disk",
            },
        ],
    );
    cloud
}
