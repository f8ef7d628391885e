//! Domain layer: pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, or `std::process`.
//! All functions are synchronous and take data in, returning data out.

pub mod config;
pub mod error;
pub mod naming;
pub mod resource;
pub mod snapshot;
pub mod topology;

pub use config::{MigraConfig, set_config_value, validate_config_key, validate_config_value};
pub use error::{ConfigError, ErrorKind, MigraError, NameError, ServiceFailure, error_kind};
pub use resource::{
    COMPUTE_DEVICE_OWNER, ImageRecord, ImageStatus, NetworkRecord, PortAddress, PortRecord,
    ServerRecord, ServerStatus, SubnetRecord,
};
pub use snapshot::{MANIFEST_FILE, ServiceSnapshot, Snapshot};
pub use topology::{AddressPlan, Application, Service};
