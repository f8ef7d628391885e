//! Authenticated JSON requests against OpenStack service endpoints.

use anyhow::Result;
use migra_common::extract_message;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::domain::MigraError;

const AUTH_HEADER: &str = "X-Auth-Token";

/// HTTP client carrying the token of one installation.
pub(crate) struct Session {
    client: reqwest::Client,
    token: String,
}

impl Session {
    pub(crate) fn new(client: reqwest::Client, token: String) -> Self {
        Self { client, token }
    }

    pub(crate) fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header(AUTH_HEADER, &self.token)
    }

    /// Send a request and fail on any non-2xx status. `what` names the
    /// target in errors.
    pub(crate) async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response> {
        let request = request.build().map_err(|e| MigraError::provider(e.to_string()))?;
        let method = request.method().clone();
        let url = request.url().clone();
        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| MigraError::provider(format!("cannot reach {}: {e}", url.as_str())))?;
        tracing::debug!(%method, url = %url, status = response.status().as_u16(), "openstack request");
        check(response, what).await
    }

    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        what: &str,
    ) -> Result<T> {
        let response = self
            .send(self.request(Method::GET, url).query(query), what)
            .await?;
        decode(response, what).await
    }

    pub(crate) async fn post<B, T>(&self, url: &str, body: &B, what: &str) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .send(self.request(Method::POST, url).json(body), what)
            .await?;
        decode(response, what).await
    }

    pub(crate) async fn put<B: Serialize + ?Sized>(&self, url: &str, body: &B, what: &str) -> Result<()> {
        self.send(self.request(Method::PUT, url).json(body), what)
            .await?;
        Ok(())
    }

    pub(crate) async fn delete(&self, url: &str, what: &str) -> Result<()> {
        self.send(self.request(Method::DELETE, url), what).await?;
        Ok(())
    }
}

/// Map an error status onto the engine's error taxonomy.
pub(crate) async fn check(response: Response, what: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::NOT_FOUND {
        return Err(MigraError::not_found(what).into());
    }
    Err(MigraError::Provider {
        status: Some(status.as_u16()),
        message: extract_message(&body),
    }
    .into())
}

async fn decode<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
    let body = response
        .bytes()
        .await
        .map_err(|e| MigraError::provider(format!("cannot read response for {what}: {e}")))?;
    serde_json::from_slice(&body).map_err(|e| {
        MigraError::provider(format!("unexpected response for {what}: {e}")).into()
    })
}

/// Make sure a catalog URL ends with the API version segment `version`.
pub(crate) fn versioned(url: &str, version: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let suffix = format!("/{version}");
    if trimmed.ends_with(&suffix) || trimmed.contains(&format!("{suffix}/")) {
        trimmed.to_string()
    } else {
        format!("{trimmed}{suffix}")
    }
}
