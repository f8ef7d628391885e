//! Keystone v3 password authentication and service catalog.

use serde::{Deserialize, Serialize};

/// Body of `POST /v3/auth/tokens` using the password method with a
/// project-scoped token.
#[derive(Debug, Serialize)]
pub struct AuthRequest<'a> {
    pub auth: Auth<'a>,
}

#[derive(Debug, Serialize)]
pub struct Auth<'a> {
    pub identity: Identity<'a>,
    pub scope: Scope<'a>,
}

#[derive(Debug, Serialize)]
pub struct Identity<'a> {
    pub methods: [&'a str; 1],
    pub password: PasswordMethod<'a>,
}

#[derive(Debug, Serialize)]
pub struct PasswordMethod<'a> {
    pub user: UserCredentials<'a>,
}

#[derive(Debug, Serialize)]
pub struct UserCredentials<'a> {
    pub name: &'a str,
    pub password: &'a str,
    pub domain: DomainRef<'a>,
}

#[derive(Debug, Serialize)]
pub struct Scope<'a> {
    pub project: ProjectRef<'a>,
}

#[derive(Debug, Serialize)]
pub struct ProjectRef<'a> {
    pub name: &'a str,
    pub domain: DomainRef<'a>,
}

#[derive(Debug, Serialize)]
pub struct DomainRef<'a> {
    pub name: &'a str,
}

impl<'a> AuthRequest<'a> {
    /// Build a password authentication request scoped to `project`.
    ///
    /// The user and the project are looked up in the same domain.
    #[must_use]
    pub fn password(user: &'a str, password: &'a str, project: &'a str, domain: &'a str) -> Self {
        Self {
            auth: Auth {
                identity: Identity {
                    methods: ["password"],
                    password: PasswordMethod {
                        user: UserCredentials {
                            name: user,
                            password,
                            domain: DomainRef { name: domain },
                        },
                    },
                },
                scope: Scope {
                    project: ProjectRef {
                        name: project,
                        domain: DomainRef { name: domain },
                    },
                },
            },
        }
    }
}

/// Body of a successful token response. The token itself travels in the
/// `X-Subject-Token` header.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub token: Token,
}

#[derive(Debug, Deserialize)]
pub struct Token {
    #[serde(default)]
    pub catalog: Vec<CatalogEntry>,
    #[serde(default)]
    pub expires_at: Option<String>,
    #[serde(default)]
    pub project: Option<ProjectInfo>,
}

#[derive(Debug, Deserialize)]
pub struct ProjectInfo {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CatalogEntry {
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

#[derive(Debug, Deserialize)]
pub struct Endpoint {
    pub interface: String,
    pub url: String,
    #[serde(default)]
    pub region: Option<String>,
}

impl Token {
    /// Find the URL of the first endpoint of `service_type` published on
    /// `interface` (`public`, `internal` or `admin`).
    #[must_use]
    pub fn endpoint(&self, service_type: &str, interface: &str) -> Option<&str> {
        self.catalog
            .iter()
            .filter(|entry| entry.service_type == service_type)
            .flat_map(|entry| entry.endpoints.iter())
            .find(|endpoint| endpoint.interface == interface)
            .map(|endpoint| endpoint.url.as_str())
    }
}
