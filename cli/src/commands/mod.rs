//! Command implementations

pub mod config;
pub mod list;
pub mod migrate;
pub mod remove;
pub mod restore;
pub mod show;
pub mod snapshot;
pub mod version;

use anyhow::Result;
use clap::Args;

use crate::domain::MigraConfig;
use crate::infra::openstack::{Credentials, OpenStackPlatform};

/// Account used on every installation a command touches.
#[derive(Args)]
pub struct AuthArgs {
    /// OpenStack user name
    #[arg(long, env = "MIGRA_USER")]
    pub user: String,

    /// OpenStack password
    #[arg(long = "pass", env = "MIGRA_PASS", hide_env_values = true)]
    pub password: String,
}

impl AuthArgs {
    #[must_use]
    pub fn credentials(&self) -> Credentials {
        Credentials {
            user: self.user.clone(),
            password: self.password.clone(),
        }
    }
}

/// A single installation to operate on.
#[derive(Args)]
pub struct PlatformArgs {
    /// Identity (Keystone) endpoint of the installation
    #[arg(long)]
    pub platform: String,

    #[command(flatten)]
    pub auth: AuthArgs,
}

impl PlatformArgs {
    /// Authenticate against the installation.
    ///
    /// # Errors
    ///
    /// Returns an error if authentication or endpoint discovery fails.
    pub async fn connect(&self, config: &MigraConfig) -> Result<OpenStackPlatform> {
        OpenStackPlatform::connect(&self.platform, &self.auth.credentials(), config).await
    }
}
