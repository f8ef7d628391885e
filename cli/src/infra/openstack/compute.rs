//! Nova: servers, server snapshots and flavors.

use anyhow::Result;
use migra_common::compute::{
    CreateImageAction, CreateImageName, CreateImageResponse, CreateServer, CreatedServer,
    FlavorList, SecurityGroupRef, Server, ServerEnvelope, ServerNetwork,
};
use reqwest::Method;
use reqwest::header::LOCATION;

use super::OpenStackPlatform;
use crate::application::ports::{ComputeGateway, ServerSpec};
use crate::domain::{MigraError, ServerRecord, ServerStatus};

impl OpenStackPlatform {
    fn compute_endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.compute_url)
    }
}

/// Image id of a `createImage` response: the body on recent microversions,
/// the last segment of `Location` otherwise.
fn created_image_id(body: &[u8], location: Option<&str>) -> Option<String> {
    let from_body = serde_json::from_slice::<CreateImageResponse>(body)
        .unwrap_or_default()
        .image_id
        .filter(|id| !id.is_empty());
    from_body.or_else(|| {
        location
            .and_then(|url| url.trim_end_matches('/').rsplit('/').next())
            .filter(|id| !id.is_empty())
            .map(str::to_owned)
    })
}

impl ComputeGateway for OpenStackPlatform {
    async fn create_server(&self, spec: &ServerSpec<'_>) -> Result<String> {
        let body = ServerEnvelope {
            server: CreateServer {
                name: spec.name,
                image_ref: spec.image_id,
                flavor_ref: spec.flavor_id,
                networks: vec![ServerNetwork {
                    port: spec.port_id,
                }],
                security_groups: spec
                    .security_groups
                    .iter()
                    .map(|name| SecurityGroupRef { name })
                    .collect(),
            },
        };
        let created: ServerEnvelope<CreatedServer> = self
            .session
            .post(&self.compute_endpoint("servers"), &body, "server")
            .await?;
        Ok(created.server.id)
    }

    async fn get_server(&self, id: &str) -> Result<ServerRecord> {
        let found: ServerEnvelope<Server> = self
            .session
            .get(
                &self.compute_endpoint(&format!("servers/{id}")),
                &[],
                &format!("server {id}"),
            )
            .await?;
        Ok(ServerRecord {
            id: found.server.id,
            name: found.server.name,
            status: ServerStatus::parse(&found.server.status),
        })
    }

    async fn delete_server(&self, id: &str) -> Result<()> {
        self.session
            .delete(
                &self.compute_endpoint(&format!("servers/{id}")),
                &format!("server {id}"),
            )
            .await
    }

    async fn create_server_image(&self, server_id: &str, image_name: &str) -> Result<String> {
        let what = format!("server {server_id}");
        let action = CreateImageAction {
            create_image: CreateImageName { name: image_name },
        };
        let response = self
            .session
            .send(
                self.session
                    .request(
                        Method::POST,
                        &self.compute_endpoint(&format!("servers/{server_id}/action")),
                    )
                    .json(&action),
                &what,
            )
            .await?;
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let body = response
            .bytes()
            .await
            .map_err(|e| MigraError::provider(format!("cannot read response for {what}: {e}")))?;
        created_image_id(&body, location.as_deref()).ok_or_else(|| {
            MigraError::provider(format!("snapshot of {what} returned no image id")).into()
        })
    }

    async fn find_flavor(&self, name: &str) -> Result<Option<String>> {
        let list: FlavorList = self
            .session
            .get(&self.compute_endpoint("flavors"), &[], "flavors")
            .await?;
        Ok(list
            .flavors
            .into_iter()
            .find(|flavor| flavor.name == name)
            .map(|flavor| flavor.id))
    }
}
