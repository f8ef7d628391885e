//! Keystone v3 password authentication.

use anyhow::Result;
use migra_common::identity::{AuthRequest, Token, TokenResponse};
use reqwest::Client;

use super::Credentials;
use super::http::check;
use crate::domain::{MigraConfig, MigraError};

const SUBJECT_TOKEN_HEADER: &str = "X-Subject-Token";

/// Token id and body returned by a successful authentication.
pub(crate) struct Authenticated {
    pub token: String,
    pub body: Token,
}

/// Authenticate `credentials` against `identity_url` (a `/v3` base URL),
/// scoped to the configured project.
pub(crate) async fn authenticate(
    client: &Client,
    identity_url: &str,
    credentials: &Credentials,
    config: &MigraConfig,
) -> Result<Authenticated> {
    let url = format!("{identity_url}/auth/tokens");
    let request = AuthRequest::password(
        &credentials.user,
        &credentials.password,
        &config.project,
        &config.domain,
    );
    let response = client
        .post(&url)
        .json(&request)
        .send()
        .await
        .map_err(|e| MigraError::provider(format!("cannot reach {url}: {e}")))?;
    tracing::debug!(url = %url, status = response.status().as_u16(), "keystone authentication");
    let response = check(response, "identity service").await?;

    let token = response
        .headers()
        .get(SUBJECT_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
        .ok_or_else(|| MigraError::provider("identity service returned no token"))?;
    let body: TokenResponse = response
        .json()
        .await
        .map_err(|e| MigraError::provider(format!("unexpected token response: {e}")))?;

    Ok(Authenticated {
        token,
        body: body.token,
    })
}
