//! Glance v2: image records and image data.

use anyhow::Result;
use futures_util::{StreamExt, TryStreamExt};
use migra_common::image::{CreateImage, Image};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Body, Method, StatusCode};

use super::OpenStackPlatform;
use crate::application::ports::{ByteStream, ImageGateway, ImageSpec};
use crate::domain::{ImageRecord, ImageStatus, MigraError};

const OCTET_STREAM: &str = "application/octet-stream";

impl OpenStackPlatform {
    fn image_endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.image_url)
    }
}

fn image_record(image: Image) -> ImageRecord {
    ImageRecord {
        id: image.id,
        name: image.name.unwrap_or_default(),
        status: ImageStatus::parse(&image.status),
        disk_format: image.disk_format,
        container_format: image.container_format,
        size: image.size,
    }
}

impl ImageGateway for OpenStackPlatform {
    async fn create_image(&self, spec: &ImageSpec<'_>) -> Result<ImageRecord> {
        let body = CreateImage {
            name: spec.name,
            disk_format: spec.disk_format,
            container_format: spec.container_format,
            visibility: "private",
        };
        let created: Image = self
            .session
            .post(&self.image_endpoint("images"), &body, "image")
            .await?;
        Ok(image_record(created))
    }

    async fn get_image(&self, id: &str) -> Result<ImageRecord> {
        let found: Image = self
            .session
            .get(
                &self.image_endpoint(&format!("images/{id}")),
                &[],
                &format!("image {id}"),
            )
            .await?;
        Ok(image_record(found))
    }

    async fn upload_image(&self, id: &str, data: ByteStream) -> Result<()> {
        let request = self
            .session
            .request(Method::PUT, &self.image_endpoint(&format!("images/{id}/file")))
            .header(CONTENT_TYPE, OCTET_STREAM)
            .body(Body::wrap_stream(data));
        self.session.send(request, &format!("image {id}")).await?;
        Ok(())
    }

    async fn download_image(&self, id: &str) -> Result<ByteStream> {
        let request = self
            .session
            .request(Method::GET, &self.image_endpoint(&format!("images/{id}/file")));
        let response = self.session.send(request, &format!("image {id}")).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Err(MigraError::provider(format!("image {id} has no data")).into());
        }
        Ok(response.bytes_stream().map_err(anyhow::Error::from).boxed())
    }

    async fn delete_image(&self, id: &str) -> Result<()> {
        self.session
            .delete(
                &self.image_endpoint(&format!("images/{id}")),
                &format!("image {id}"),
            )
            .await
    }
}
