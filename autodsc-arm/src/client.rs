//! Node configuration client over the ARM REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{ArmError, Result};
use crate::models::{ErrorResponse, NodeConfiguration, NodeConfigurationParameters};
use crate::resource_id::AUTOMATION_PROVIDER;

pub const DEFAULT_ENDPOINT: &str = "https://management.azure.com";
pub const DEFAULT_API_VERSION: &str = "2015-10-31";

/// Remote operations on DSC node configurations.
///
/// `create_or_update` is an upsert: callers never need to know whether the
/// object already exists. A missing object is reported as
/// [`ArmError::NotFound`] by `get` and `delete`.
#[async_trait]
pub trait NodeConfigurationClient: Send + Sync {
    async fn create_or_update(
        &self,
        cancel: &CancellationToken,
        resource_group: &str,
        account_name: &str,
        name: &str,
        parameters: &NodeConfigurationParameters,
    ) -> Result<NodeConfiguration>;

    async fn get(
        &self,
        cancel: &CancellationToken,
        resource_group: &str,
        account_name: &str,
        name: &str,
    ) -> Result<NodeConfiguration>;

    async fn delete(
        &self,
        cancel: &CancellationToken,
        resource_group: &str,
        account_name: &str,
        name: &str,
    ) -> Result<()>;
}

/// Connection settings for [`HttpNodeConfigurationClient`].
#[derive(Debug, Clone)]
pub struct ArmClientConfig {
    pub endpoint: String,
    pub subscription_id: String,
    /// Bearer token; acquiring it is the caller's business.
    pub access_token: Option<String>,
    pub api_version: String,
    pub timeout: Duration,
}

impl ArmClientConfig {
    pub fn new(subscription_id: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            subscription_id: subscription_id.into(),
            access_token: None,
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// HTTP implementation of [`NodeConfigurationClient`].
#[derive(Clone)]
pub struct HttpNodeConfigurationClient {
    http: Client,
    base: Url,
    config: ArmClientConfig,
}

impl HttpNodeConfigurationClient {
    pub fn new(config: ArmClientConfig) -> Result<Self> {
        let base = Url::parse(&config.endpoint)
            .map_err(|e| ArmError::InvalidEndpoint(format!("{}: {}", config.endpoint, e)))?;
        if base.cannot_be_a_base() {
            return Err(ArmError::InvalidEndpoint(config.endpoint.clone()));
        }

        let http = Client::builder().timeout(config.timeout).build()?;

        Ok(Self { http, base, config })
    }

    pub fn subscription_id(&self) -> &str {
        &self.config.subscription_id
    }

    fn resource_url(&self, resource_group: &str, account_name: &str, name: &str) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ArmError::InvalidEndpoint(self.config.endpoint.clone()))?
            .pop_if_empty()
            .extend([
                "subscriptions",
                self.config.subscription_id.as_str(),
                "resourceGroups",
                resource_group,
                "providers",
                AUTOMATION_PROVIDER,
                "automationAccounts",
                account_name,
                "nodeConfigurations",
                name,
            ]);
        url.query_pairs_mut()
            .append_pair("api-version", &self.config.api_version);
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&NodeConfigurationParameters>,
    ) -> Result<reqwest::Response> {
        debug!("{} {}", method, url.path());

        let mut request = self.http.request(method, url);
        if let Some(token) = &self.config.access_token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        Ok(request.send().await?)
    }
}

/// Run a whole request/response exchange, body included, unless `cancel` fires first.
async fn cancellable<T>(
    cancel: &CancellationToken,
    exchange: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        _ = cancel.cancelled() => Err(ArmError::Cancelled),
        result = exchange => result,
    }
}

/// Turn a non-success response into an error, classifying 404 by status.
async fn error_for(resource: &str, response: reqwest::Response) -> ArmError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    if status == StatusCode::NOT_FOUND {
        return ArmError::NotFound(resource.to_string());
    }

    match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(envelope) => ArmError::Api {
            status: status.as_u16(),
            code: envelope.error.code,
            message: envelope.error.message,
        },
        Err(_) => ArmError::Api {
            status: status.as_u16(),
            code: status
                .canonical_reason()
                .unwrap_or("Unknown")
                .to_string(),
            message: body,
        },
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[async_trait]
impl NodeConfigurationClient for HttpNodeConfigurationClient {
    async fn create_or_update(
        &self,
        cancel: &CancellationToken,
        resource_group: &str,
        account_name: &str,
        name: &str,
        parameters: &NodeConfigurationParameters,
    ) -> Result<NodeConfiguration> {
        let url = self.resource_url(resource_group, account_name, name)?;
        cancellable(cancel, async {
            let response = self.send(Method::PUT, url, Some(parameters)).await?;
            if !response.status().is_success() {
                return Err(error_for(name, response).await);
            }
            decode(response).await
        })
        .await
    }

    async fn get(
        &self,
        cancel: &CancellationToken,
        resource_group: &str,
        account_name: &str,
        name: &str,
    ) -> Result<NodeConfiguration> {
        let url = self.resource_url(resource_group, account_name, name)?;
        cancellable(cancel, async {
            let response = self.send(Method::GET, url, None).await?;
            if !response.status().is_success() {
                return Err(error_for(name, response).await);
            }
            decode(response).await
        })
        .await
    }

    async fn delete(
        &self,
        cancel: &CancellationToken,
        resource_group: &str,
        account_name: &str,
        name: &str,
    ) -> Result<()> {
        let url = self.resource_url(resource_group, account_name, name)?;
        cancellable(cancel, async {
            let response = self.send(Method::DELETE, url, None).await?;
            match response.status() {
                StatusCode::OK | StatusCode::ACCEPTED | StatusCode::NO_CONTENT => Ok(()),
                _ => Err(error_for(name, response).await),
            }
        })
        .await
    }
}
