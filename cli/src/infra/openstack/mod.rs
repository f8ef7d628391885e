//! OpenStack REST adapter.
//!
//! One [`OpenStackPlatform`] holds an authenticated session against a single
//! installation and implements the network, compute and image gateways over
//! the Neutron, Nova and Glance HTTP APIs.

mod compute;
mod http;
mod identity;
mod image;
mod network;

use anyhow::{Context, Result};
use migra_common::identity::Token;
use migra_common::network::RouterList;

use crate::domain::{MigraConfig, MigraError};
use http::{Session, versioned};

/// Account used to authenticate against an installation.
#[derive(Clone)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

/// Authenticated connection to one OpenStack installation.
pub struct OpenStackPlatform {
    session: Session,
    network_url: String,
    compute_url: String,
    image_url: String,
    router_id: Option<String>,
}

impl OpenStackPlatform {
    /// Authenticate against the identity endpoint `endpoint` and resolve the
    /// service endpoints and router of the configured project.
    ///
    /// # Errors
    ///
    /// Fails when authentication is rejected, when the service catalog lacks
    /// a network, compute or image endpoint, or when a configured router
    /// cannot be found.
    pub async fn connect(
        endpoint: &str,
        credentials: &Credentials,
        config: &MigraConfig,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("migra/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("cannot build HTTP client")?;

        let identity_url = versioned(endpoint, "v3");
        let auth = identity::authenticate(&client, &identity_url, credentials, config)
            .await
            .with_context(|| format!("authentication at {endpoint} failed"))?;

        let network_url = versioned(catalog_url(&auth.body, "network", &config.interface)?, "v2.0");
        let compute_url = catalog_url(&auth.body, "compute", &config.interface)?
            .trim_end_matches('/')
            .to_string();
        let image_url = versioned(catalog_url(&auth.body, "image", &config.interface)?, "v2");
        let project_id = auth.body.project.as_ref().map(|p| p.id.clone());

        let mut platform = Self {
            session: Session::new(client, auth.token),
            network_url,
            compute_url,
            image_url,
            router_id: None,
        };
        platform.router_id = platform
            .discover_router(config.router.as_deref(), project_id.as_deref())
            .await?;
        tracing::debug!(
            endpoint,
            router = platform.router_id.as_deref().unwrap_or("none"),
            "connected"
        );
        Ok(platform)
    }

    /// The configured router by name, else the first router of the project.
    async fn discover_router(
        &self,
        name: Option<&str>,
        project_id: Option<&str>,
    ) -> Result<Option<String>> {
        let url = format!("{}/routers", self.network_url);
        if let Some(name) = name {
            let list: RouterList = self
                .session
                .get(&url, &[("name", name)], "routers")
                .await?;
            return match list.routers.into_iter().next() {
                Some(router) => Ok(Some(router.id)),
                None => Err(MigraError::not_found(format!("router '{name}'")).into()),
            };
        }
        let query: Vec<(&str, &str)> = project_id
            .map(|id| vec![("project_id", id)])
            .unwrap_or_default();
        let list: RouterList = self.session.get(&url, &query, "routers").await?;
        Ok(list.routers.into_iter().next().map(|router| router.id))
    }
}

fn catalog_url<'a>(token: &'a Token, service_type: &str, interface: &str) -> Result<&'a str> {
    token.endpoint(service_type, interface).ok_or_else(|| {
        MigraError::provider(format!(
            "no {interface} {service_type} endpoint in the service catalog"
        ))
        .into()
    })
}
