//! Glance v2 image records.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub status: String,
    #[serde(default)]
    pub disk_format: Option<String>,
    #[serde(default)]
    pub container_format: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct CreateImage<'a> {
    pub name: &'a str,
    pub disk_format: &'a str,
    pub container_format: &'a str,
    pub visibility: &'a str,
}
