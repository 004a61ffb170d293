//! Ambient Azure credentials.
//!
//! [`DefaultCredential`] walks a fixed list of sources and returns the first
//! bearer token any of them produces. Configuration is via environment
//! variables:
//! - `AZURE_ACCESS_TOKEN` - a token acquired elsewhere, used as-is
//! - `AZURE_TENANT_ID`, `AZURE_CLIENT_ID`, `AZURE_CLIENT_SECRET` - service principal
//! - `AZURE_AUTHORITY_HOST` - token authority (default: `https://login.microsoftonline.com`)
//! - `AZURE_CLIENT_ID` alone - user-assigned managed identity
//!
//! Managed identity (IMDS) and the Azure CLI login cache are always tried.

mod azure_cli;
mod token;

use std::fmt;
use std::time::Duration;

use reqwest::Client;
use thiserror::Error;

pub use token::AccessToken;

/// Default Microsoft Entra authority.
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// Instance Metadata Service token endpoint.
pub const IMDS_TOKEN_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";

const IMDS_API_VERSION: &str = "2018-02-01";

/// IMDS is link-local; off Azure the request should fail fast.
const IMDS_TIMEOUT: Duration = Duration::from_secs(3);

const TOKEN_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("{credential}: {message}")]
    Source {
        credential: &'static str,
        message: String,
    },

    #[error("No credential source produced a token: {}", .0.join("; "))]
    Unavailable(Vec<String>),
}

impl CredentialError {
    fn from_source(credential: &'static str, message: impl fmt::Display) -> Self {
        CredentialError::Source {
            credential,
            message: message.to_string(),
        }
    }
}

/// One place a token can come from.
#[derive(Clone)]
pub enum CredentialSource {
    AccessToken(String),
    ClientSecret {
        authority_host: String,
        tenant_id: String,
        client_id: String,
        client_secret: String,
    },
    ManagedIdentity {
        endpoint: String,
        client_id: Option<String>,
    },
    AzureCli,
}

impl fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl CredentialSource {
    pub fn name(&self) -> &'static str {
        match self {
            CredentialSource::AccessToken(_) => "AccessToken",
            CredentialSource::ClientSecret { .. } => "ClientSecret",
            CredentialSource::ManagedIdentity { .. } => "ManagedIdentity",
            CredentialSource::AzureCli => "AzureCli",
        }
    }

    /// Request a token for `resource` (e.g. `https://management.azure.com`).
    pub async fn get_token(
        &self,
        http: &Client,
        resource: &str,
    ) -> Result<AccessToken, CredentialError> {
        let name = self.name();
        match self {
            CredentialSource::AccessToken(token) => Ok(AccessToken {
                token: token.clone(),
                expires_on: None,
            }),
            CredentialSource::ClientSecret {
                authority_host,
                tenant_id,
                client_id,
                client_secret,
            } => {
                let url = format!(
                    "{}/{}/oauth2/v2.0/token",
                    authority_host.trim_end_matches('/'),
                    tenant_id
                );
                let scope = format!("{}/.default", resource.trim_end_matches('/'));
                let response = http
                    .post(&url)
                    .timeout(TOKEN_TIMEOUT)
                    .form(&[
                        ("grant_type", "client_credentials"),
                        ("client_id", client_id.as_str()),
                        ("client_secret", client_secret.as_str()),
                        ("scope", scope.as_str()),
                    ])
                    .send()
                    .await
                    .map_err(|e| CredentialError::from_source(name, e))?;
                token::from_response(name, response).await
            }
            CredentialSource::ManagedIdentity {
                endpoint,
                client_id,
            } => {
                let mut query = vec![
                    ("api-version", IMDS_API_VERSION.to_string()),
                    ("resource", format!("{}/", resource.trim_end_matches('/'))),
                ];
                if let Some(id) = client_id {
                    query.push(("client_id", id.clone()));
                }
                let response = http
                    .get(endpoint)
                    .query(&query)
                    .header("Metadata", "true")
                    .timeout(IMDS_TIMEOUT)
                    .send()
                    .await
                    .map_err(|e| CredentialError::from_source(name, e))?;
                token::from_response(name, response).await
            }
            CredentialSource::AzureCli => azure_cli::get_token(resource).await,
        }
    }
}

/// Tries each [`CredentialSource`] in order.
#[derive(Debug, Clone)]
pub struct DefaultCredential {
    sources: Vec<CredentialSource>,
    http: Client,
}

impl DefaultCredential {
    pub fn new(sources: Vec<CredentialSource>) -> Self {
        Self {
            sources,
            http: Client::new(),
        }
    }

    /// Build the source chain from environment variables.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        let mut sources = Vec::new();

        if let Some(token) = var("AZURE_ACCESS_TOKEN") {
            sources.push(CredentialSource::AccessToken(token));
        }
        if let (Some(tenant_id), Some(client_id), Some(client_secret)) = (
            var("AZURE_TENANT_ID"),
            var("AZURE_CLIENT_ID"),
            var("AZURE_CLIENT_SECRET"),
        ) {
            sources.push(CredentialSource::ClientSecret {
                authority_host: var("AZURE_AUTHORITY_HOST")
                    .unwrap_or_else(|| DEFAULT_AUTHORITY_HOST.to_string()),
                tenant_id,
                client_id,
                client_secret,
            });
        }
        sources.push(CredentialSource::ManagedIdentity {
            endpoint: IMDS_TOKEN_ENDPOINT.to_string(),
            client_id: var("AZURE_CLIENT_ID"),
        });
        sources.push(CredentialSource::AzureCli);

        Self::new(sources)
    }

    pub fn sources(&self) -> &[CredentialSource] {
        &self.sources
    }

    /// First token any source hands out for `resource`.
    pub async fn get_token(&self, resource: &str) -> Result<AccessToken, CredentialError> {
        let mut failures = Vec::new();
        for source in &self.sources {
            match source.get_token(&self.http, resource).await {
                Ok(token) => {
                    tracing::info!(
                        credential = source.name(),
                        expires_on = ?token.expires_on,
                        "acquired access token"
                    );
                    return Ok(token);
                }
                Err(e) => {
                    tracing::debug!(credential = source.name(), error = %e, "credential unavailable");
                    failures.push(e.to_string());
                }
            }
        }
        Err(CredentialError::Unavailable(failures))
    }
}
