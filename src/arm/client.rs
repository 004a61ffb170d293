//! HTTP client for the Azure Resource Manager API.
//!
//! One client is bound to one subscription and one bearer token for the
//! lifetime of a run. List operations hand back a lazy [`Pager`]; power
//! operations return as soon as the provider accepts them.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use uuid::Uuid;

use super::Pager;
use crate::credential::AccessToken;
use crate::models::*;
use crate::resource_id::VmIdentifier;

/// Public-cloud ARM endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://management.azure.com";

/// `Microsoft.DesktopVirtualization` API version.
pub const DESKTOP_VIRTUALIZATION_API_VERSION: &str = "2024-04-03";

/// `Microsoft.Compute` API version.
pub const COMPUTE_API_VERSION: &str = "2024-07-01";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

fn user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

/// ARM client errors. Every variant names the resource it was about.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request for {resource} failed: {source}")]
    Http {
        resource: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Not found: {resource}: {message}")]
    NotFound { resource: String, message: String },

    #[error("Unauthorized for {resource}: {message}")]
    Unauthorized { resource: String, message: String },

    #[error("Provider error for {resource}: {status} {code}: {message}")]
    Provider {
        resource: String,
        status: StatusCode,
        code: String,
        message: String,
    },

    #[error("Failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
}

impl ClientError {
    fn http(resource: &str) -> impl FnOnce(reqwest::Error) -> ClientError + '_ {
        move |source| ClientError::Http {
            resource: resource.to_string(),
            source,
        }
    }
}

/// HTTP client for Azure Resource Manager.
#[derive(Debug, Clone)]
pub struct ArmClient {
    endpoint: String,
    subscription_id: String,
    token: String,
    client: Client,
}

impl ArmClient {
    /// Create a client for `subscription_id` against `endpoint`.
    pub fn new(
        endpoint: impl Into<String>,
        subscription_id: impl Into<String>,
        token: &AccessToken,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent())
            .build()
            .map_err(ClientError::Build)?;

        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            subscription_id: subscription_id.into(),
            token: token.token.clone(),
            client,
        })
    }

    fn url(&self, path: &str, api_version: &str) -> String {
        format!(
            "{}/subscriptions/{}{}?api-version={}",
            self.endpoint, self.subscription_id, path, api_version
        )
    }

    /// Build a request with auth and a fresh client request id.
    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let request_id = Uuid::new_v4();
        tracing::debug!(method = method.as_str(), url, %request_id, "ARM request");
        self.client
            .request(method, url)
            .bearer_auth(&self.token)
            .header("x-ms-client-request-id", request_id.to_string())
    }

    /// Convert a non-success response into a [`ClientError`].
    async fn error_from(resource: &str, response: reqwest::Response) -> ClientError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let (code, message) = match serde_json::from_str::<ArmErrorResponse>(&body) {
            Ok(envelope) => (envelope.error.code, envelope.error.message),
            Err(_) => (String::new(), body),
        };
        let resource = resource.to_string();
        match status {
            StatusCode::NOT_FOUND => ClientError::NotFound { resource, message },
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ClientError::Unauthorized { resource, message }
            }
            _ => ClientError::Provider {
                resource,
                status,
                code,
                message,
            },
        }
    }

    /// Fetch one page of a list operation.
    pub(crate) async fn get_page<T: DeserializeOwned>(
        &self,
        url: &str,
        resource: &str,
    ) -> Result<Page<T>, ClientError> {
        let response = self
            .request(reqwest::Method::GET, url)
            .send()
            .await
            .map_err(ClientError::http(resource))?;

        if !response.status().is_success() {
            return Err(Self::error_from(resource, response).await);
        }
        response.json().await.map_err(ClientError::http(resource))
    }

    // ============================================================
    // Desktop Virtualization
    // ============================================================

    /// All host pools in the subscription.
    pub fn list_host_pools(&self) -> Pager<'_, HostPool> {
        let url = self.url(
            "/providers/Microsoft.DesktopVirtualization/hostPools",
            DESKTOP_VIRTUALIZATION_API_VERSION,
        );
        let resource = format!("host pools in subscription '{}'", self.subscription_id);
        Pager::new(self, url, resource)
    }

    /// Host pools in one resource group.
    pub fn list_host_pools_in_group(&self, resource_group: &str) -> Pager<'_, HostPool> {
        let url = self.url(
            &format!(
                "/resourceGroups/{}/providers/Microsoft.DesktopVirtualization/hostPools",
                resource_group
            ),
            DESKTOP_VIRTUALIZATION_API_VERSION,
        );
        let resource = format!("host pools in resource group '{}'", resource_group);
        Pager::new(self, url, resource)
    }

    /// Session hosts registered to `host_pool`.
    ///
    /// A pool or resource group that does not exist fails with
    /// [`ClientError::NotFound`] on the first page.
    pub fn list_session_hosts(
        &self,
        resource_group: &str,
        host_pool: &str,
    ) -> Pager<'_, SessionHost> {
        let url = self.url(
            &format!(
                "/resourceGroups/{}/providers/Microsoft.DesktopVirtualization/hostPools/{}/sessionHosts",
                resource_group, host_pool
            ),
            DESKTOP_VIRTUALIZATION_API_VERSION,
        );
        let resource = format!(
            "host pool '{}' in resource group '{}'",
            host_pool, resource_group
        );
        Pager::new(self, url, resource)
    }

    // ============================================================
    // Compute
    // ============================================================

    /// Post a begin-start or begin-deallocate for `vm`.
    ///
    /// Returns once the provider accepts the request (200 or 202).
    pub async fn begin_power_action(
        &self,
        vm: &VmIdentifier,
        action: PowerAction,
    ) -> Result<ActionAccepted, ClientError> {
        let url = self.url(
            &format!(
                "/resourceGroups/{}/providers/Microsoft.Compute/virtualMachines/{}/{}",
                vm.resource_group,
                vm.vm_name,
                action.as_str()
            ),
            COMPUTE_API_VERSION,
        );
        let resource = format!(
            "virtual machine '{}' in resource group '{}'",
            vm.vm_name, vm.resource_group
        );

        let response = self
            .request(reqwest::Method::POST, &url)
            .header(reqwest::header::CONTENT_LENGTH, 0)
            .send()
            .await
            .map_err(ClientError::http(&resource))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::error_from(&resource, response).await);
        }

        let headers = response.headers();
        let operation_url = headers
            .get("azure-asyncoperation")
            .or_else(|| headers.get(reqwest::header::LOCATION))
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        Ok(ActionAccepted {
            vm: vm.clone(),
            action,
            status,
            operation_url,
        })
    }
}
