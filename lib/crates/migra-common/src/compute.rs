//! Nova servers, flavors and the `createImage` server action.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ServerNetwork<'a> {
    pub port: &'a str,
}

#[derive(Debug, Serialize)]
pub struct SecurityGroupRef<'a> {
    pub name: &'a str,
}

#[derive(Debug, Serialize)]
pub struct CreateServer<'a> {
    pub name: &'a str,
    #[serde(rename = "imageRef")]
    pub image_ref: &'a str,
    #[serde(rename = "flavorRef")]
    pub flavor_ref: &'a str,
    pub networks: Vec<ServerNetwork<'a>>,
    pub security_groups: Vec<SecurityGroupRef<'a>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServerEnvelope<T> {
    pub server: T,
}

#[derive(Debug, Deserialize)]
pub struct CreatedServer {
    pub id: String,
}

/// `POST /servers/{id}/action` body asking Nova to snapshot a server.
#[derive(Debug, Serialize)]
pub struct CreateImageAction<'a> {
    #[serde(rename = "createImage")]
    pub create_image: CreateImageName<'a>,
}

#[derive(Debug, Serialize)]
pub struct CreateImageName<'a> {
    pub name: &'a str,
}

/// Compute microversions 2.45+ return the image id in the body; older ones
/// only set the `Location` header.
#[derive(Debug, Default, Deserialize)]
pub struct CreateImageResponse {
    #[serde(default)]
    pub image_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Flavor {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct FlavorList {
    #[serde(default)]
    pub flavors: Vec<Flavor>,
}
