//! Shared test helpers for application service tests.
//!
//! Provides a reporter that records messages and a gateway that records
//! deletions and bails with "not expected" on everything else.

#![allow(clippy::unwrap_used)]

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Result, bail};

use crate::application::ports::{
    ArtifactStore, ByteStream, ComputeGateway, ImageGateway, ImageSpec, NetworkFilter,
    NetworkGateway, PortSpec, ProgressReporter, ServerSpec, SubnetSpec,
};
use crate::domain::{
    ImageRecord, MigraError, NetworkRecord, PortRecord, ServerRecord, SubnetRecord,
};

#[derive(Default)]
pub struct RecordingReporter {
    messages: Mutex<Vec<(&'static str, String)>>,
}

impl RecordingReporter {
    pub fn warnings(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|(level, _)| *level == "warn")
            .map(|(_, msg)| msg.clone())
            .collect()
    }
}

impl ProgressReporter for RecordingReporter {
    fn step(&self, message: &str) {
        self.messages.lock().unwrap().push(("step", message.to_string()));
    }
    fn success(&self, message: &str) {
        self.messages
            .lock()
            .unwrap()
            .push(("success", message.to_string()));
    }
    fn warn(&self, message: &str) {
        self.messages.lock().unwrap().push(("warn", message.to_string()));
    }
}

/// Records delete calls in order. Servers are reported gone as soon as they
/// are looked up.
#[derive(Default)]
pub struct DeletionRecorder {
    calls: Mutex<Vec<String>>,
    fail_on: Option<&'static str>,
}

impl DeletionRecorder {
    pub fn failing_on(op: &'static str) -> Self {
        Self {
            calls: Mutex::default(),
            fail_on: Some(op),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, op: &'static str, detail: String) -> Result<()> {
        self.calls.lock().unwrap().push(format!("{op} {detail}"));
        if self.fail_on == Some(op) {
            bail!(MigraError::provider(format!("{op} refused")));
        }
        Ok(())
    }
}

/// Generate port methods that bail with "not expected".
macro_rules! not_expected {
    ($(async fn $name:ident(&self $(, $arg:ident: $ty:ty)*) -> $ret:ty;)*) => {
        $(
            async fn $name(&self $(, $arg: $ty)*) -> $ret {
                $(let _ = $arg;)*
                bail!(concat!(stringify!($name), " not expected"))
            }
        )*
    };
}

impl NetworkGateway for DeletionRecorder {
    fn router_id(&self) -> Option<&str> {
        Some("r1")
    }

    not_expected! {
        async fn create_network(&self, name: &str) -> Result<NetworkRecord>;
        async fn get_network(&self, id: &str) -> Result<NetworkRecord>;
        async fn list_networks(&self, filter: NetworkFilter<'_>) -> Result<Vec<NetworkRecord>>;
        async fn create_subnet(&self, spec: &SubnetSpec<'_>) -> Result<SubnetRecord>;
        async fn get_subnet(&self, id: &str) -> Result<SubnetRecord>;
        async fn add_router_interface(&self, router_id: &str, subnet_id: &str) -> Result<()>;
        async fn create_port(&self, spec: &PortSpec<'_>) -> Result<PortRecord>;
        async fn list_ports(&self, network_id: &str, device_owner: Option<&str>) -> Result<Vec<PortRecord>>;
        async fn get_port(&self, id: &str) -> Result<PortRecord>;
    }

    async fn delete_network(&self, id: &str) -> Result<()> {
        self.record("delete_network", id.to_string())
    }

    async fn remove_router_interface(&self, router_id: &str, subnet_id: &str) -> Result<()> {
        self.record("detach", format!("{router_id} {subnet_id}"))
    }

    async fn delete_port(&self, id: &str) -> Result<()> {
        self.record("delete_port", id.to_string())
    }
}

impl ComputeGateway for DeletionRecorder {
    not_expected! {
        async fn create_server(&self, spec: &ServerSpec<'_>) -> Result<String>;
        async fn create_server_image(&self, server_id: &str, image_name: &str) -> Result<String>;
        async fn find_flavor(&self, name: &str) -> Result<Option<String>>;
    }

    async fn get_server(&self, id: &str) -> Result<ServerRecord> {
        self.record("get_server", id.to_string())?;
        bail!(MigraError::not_found(format!("server {id}")))
    }

    async fn delete_server(&self, id: &str) -> Result<()> {
        self.record("delete_server", id.to_string())
    }
}

impl ImageGateway for DeletionRecorder {
    not_expected! {
        async fn create_image(&self, spec: &ImageSpec<'_>) -> Result<ImageRecord>;
        async fn get_image(&self, id: &str) -> Result<ImageRecord>;
        async fn upload_image(&self, id: &str, data: ByteStream) -> Result<()>;
        async fn download_image(&self, id: &str) -> Result<ByteStream>;
    }

    async fn delete_image(&self, id: &str) -> Result<()> {
        self.record("delete_image", id.to_string())
    }
}

impl ArtifactStore for DeletionRecorder {
    not_expected! {
        async fn create_snapshot_dir(&self, application: &str) -> Result<PathBuf>;
        async fn write_artifact(&self, path: &Path, data: ByteStream) -> Result<u64>;
        async fn open_artifact(&self, path: &Path) -> Result<(u64, ByteStream)>;
        async fn write_file(&self, path: &Path, contents: &[u8]) -> Result<()>;
        async fn read_to_string(&self, path: &Path) -> Result<String>;
    }

    async fn exists(&self, _: &Path) -> bool {
        false
    }

    async fn remove_file(&self, path: &Path) -> Result<()> {
        self.record("remove_file", path.display().to_string())
    }

    async fn remove_dir(&self, path: &Path) -> Result<()> {
        self.record("remove_dir", path.display().to_string())
    }
}
