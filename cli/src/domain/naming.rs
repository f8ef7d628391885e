//! Platform resource naming.
//!
//! The topology of an application lives only in the names of its platform
//! resources: `<app>net`, `<app>subnet`, `<app><service>port`,
//! `<app><service>vm` and `<app><service>snap`. Encoding and decoding are
//! kept together here so both directions always agree.
//!
//! Pure functions only: no I/O and no async.

use anyhow::Result;

use crate::domain::error::NameError;

pub const NETWORK_SUFFIX: &str = "net";
pub const SUBNET_SUFFIX: &str = "subnet";
pub const PORT_SUFFIX: &str = "port";
pub const SERVER_SUFFIX: &str = "vm";
pub const IMAGE_SUFFIX: &str = "snap";
pub const ARTIFACT_EXTENSION: &str = "raw";

#[must_use]
pub fn network_name(app: &str) -> String {
    format!("{app}{NETWORK_SUFFIX}")
}

#[must_use]
pub fn subnet_name(app: &str) -> String {
    format!("{app}{SUBNET_SUFFIX}")
}

#[must_use]
pub fn port_name(app: &str, service: &str) -> String {
    format!("{app}{service}{PORT_SUFFIX}")
}

#[must_use]
pub fn server_name(app: &str, service: &str) -> String {
    format!("{app}{service}{SERVER_SUFFIX}")
}

#[must_use]
pub fn image_name(app: &str, service: &str) -> String {
    format!("{app}{service}{IMAGE_SUFFIX}")
}

/// File name of a service's disk artifact inside a snapshot directory.
#[must_use]
pub fn artifact_file_name(service: &str) -> String {
    format!("{service}.{ARTIFACT_EXTENSION}")
}

/// Recover the application name from a network name.
///
/// Returns `None` when the name lacks the network suffix or nothing is left
/// once it is stripped.
#[must_use]
pub fn application_from_network(network: &str) -> Option<&str> {
    network
        .strip_suffix(NETWORK_SUFFIX)
        .filter(|app| !app.is_empty())
}

/// Recover the service name from a port name belonging to `app`.
///
/// Returns `None` unless the port name is `<app><service>port` with a
/// non-empty service part.
#[must_use]
pub fn service_from_port<'a>(app: &str, port: &'a str) -> Option<&'a str> {
    port.strip_prefix(app)
        .and_then(|rest| rest.strip_suffix(PORT_SUFFIX))
        .filter(|service| !service.is_empty())
}

/// Validate an application or service name used to build resource and file
/// names.
///
/// # Errors
///
/// Returns an error if the name is empty, is `.` or `..`, or contains a
/// path separator or whitespace.
pub fn validate_component(kind: &'static str, name: &str) -> Result<()> {
    let invalid = |reason: &'static str| NameError::Invalid {
        kind,
        name: name.to_string(),
        reason,
    };
    if name.is_empty() {
        return Err(invalid("must not be empty").into());
    }
    if name == "." || name == ".." {
        return Err(invalid("must not be a relative path component").into());
    }
    if name.contains(['/', '\\']) {
        return Err(invalid("must not contain a path separator").into());
    }
    if name.chars().any(char::is_whitespace) {
        return Err(invalid("must not contain whitespace").into());
    }
    Ok(())
}
