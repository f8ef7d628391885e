//! Domain types and validators for Migra configuration.
//!
//! Pure functions only, without I/O or async.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;

// ── Constants ────────────────────────────────────────────────────────────────

pub const VALID_CONFIG_KEYS: &[&str] = &[
    "project",
    "domain",
    "interface",
    "router",
    "flavor",
    "security_group",
    "image_timeout_secs",
    "server_timeout_secs",
    "poll_interval_ms",
    "concurrency",
    "rollback",
    "work_dir",
];
pub const VALID_INTERFACES: &[&str] = &["public", "internal", "admin"];

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `~/.migra/config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigraConfig {
    /// Project the token is scoped to.
    pub project: String,
    /// Identity domain of both the user and the project.
    pub domain: String,
    /// Catalog interface used for service endpoints.
    pub interface: String,
    /// Router to attach restored subnets to. First router of the project when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub router: Option<String>,
    /// Flavor of restored servers.
    pub flavor: String,
    /// Security group of restored servers.
    pub security_group: String,
    pub image_timeout_secs: u64,
    pub server_timeout_secs: u64,
    /// First poll interval; doubled after every unsuccessful poll.
    pub poll_interval_ms: u64,
    /// Services processed at the same time during snapshot and restore.
    pub concurrency: usize,
    /// Undo created resources when a snapshot or restore fails.
    pub rollback: bool,
    /// Parent directory of snapshot directories. System temp dir when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<PathBuf>,
}

impl Default for MigraConfig {
    fn default() -> Self {
        Self {
            project: "sbdioi40".to_string(),
            domain: "Default".to_string(),
            interface: "public".to_string(),
            router: None,
            flavor: "m1.tiny".to_string(),
            security_group: "default".to_string(),
            image_timeout_secs: 60,
            server_timeout_secs: 60,
            poll_interval_ms: 1000,
            concurrency: 1,
            rollback: false,
            work_dir: None,
        }
    }
}

// ── Validators ───────────────────────────────────────────────────────────────

/// Validates a configuration key against the whitelist.
///
/// # Errors
///
/// Returns an error if the key is not in the allowed list.
pub fn validate_config_key(key: &str) -> Result<()> {
    if !VALID_CONFIG_KEYS.contains(&key) {
        return Err(ConfigError::UnknownKey {
            key: key.to_string(),
            valid: VALID_CONFIG_KEYS.join(", "),
        }
        .into());
    }
    Ok(())
}

/// Validates a configuration value for the given key.
///
/// # Errors
///
/// Returns an error if the value is not valid for the key.
pub fn validate_config_value(key: &str, value: &str) -> Result<()> {
    let mut scratch = MigraConfig::default();
    set_config_value(&mut scratch, key, value)
}

/// Validates `value` and stores it under `key`.
///
/// An empty value clears the optional keys `router` and `work_dir`.
///
/// # Errors
///
/// Returns an error if the key is unknown or the value does not parse.
pub fn set_config_value(config: &mut MigraConfig, key: &str, value: &str) -> Result<()> {
    match key {
        "project" => config.project = non_empty(key, value)?,
        "domain" => config.domain = non_empty(key, value)?,
        "interface" => {
            if !VALID_INTERFACES.contains(&value) {
                return Err(invalid(key, value, "public, internal or admin"));
            }
            config.interface = value.to_string();
        }
        "router" => config.router = optional(value).map(str::to_string),
        "flavor" => config.flavor = non_empty(key, value)?,
        "security_group" => config.security_group = non_empty(key, value)?,
        "image_timeout_secs" => config.image_timeout_secs = positive(key, value)?,
        "server_timeout_secs" => config.server_timeout_secs = positive(key, value)?,
        "poll_interval_ms" => config.poll_interval_ms = positive(key, value)?,
        "concurrency" => {
            config.concurrency = usize::try_from(positive(key, value)?)
                .map_err(|_| invalid(key, value, "a positive integer"))?;
        }
        "rollback" => {
            config.rollback = value
                .parse()
                .map_err(|_| invalid(key, value, "true or false"))?;
        }
        "work_dir" => config.work_dir = optional(value).map(PathBuf::from),
        _ => return validate_config_key(key),
    }
    Ok(())
}

fn invalid(key: &str, value: &str, expected: &'static str) -> anyhow::Error {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        expected,
    }
    .into()
}

fn non_empty(key: &str, value: &str) -> Result<String> {
    if value.trim().is_empty() {
        return Err(invalid(key, value, "a non-empty string"));
    }
    Ok(value.to_string())
}

fn positive(key: &str, value: &str) -> Result<u64> {
    match value.parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(invalid(key, value, "a positive integer")),
    }
}

fn optional(value: &str) -> Option<&str> {
    Some(value).filter(|v| !v.is_empty())
}

// ── Unit tests ───────────────────────────────────────────────────────────────
