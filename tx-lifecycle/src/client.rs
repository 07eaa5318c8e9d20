//! An HTTP client of the deployment orchestrator

use deploy_common::{
    constants::{ADDRESSES_ROUTE, DEPLOY_V1_ROUTE, STATUS_ROUTE, UPGRADE_TO_V2_ROUTE},
    types::{AddressesResponse, ApiError, DeployResponse, StatusResponse, UpgradeResponse},
};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::errors::ClientError;

/// A client of the orchestrator's HTTP API
#[derive(Clone, Debug)]
pub struct OrchestratorClient {
    /// The underlying HTTP client
    http: Client,
    /// The base URL of the orchestrator, without a trailing slash
    base_url: String,
}

impl OrchestratorClient {
    /// A client of the orchestrator at `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http: Client::new(), base_url }
    }

    /// The active deployment, `None` if nothing is deployed
    pub async fn addresses(&self) -> Result<Option<AddressesResponse>, ClientError> {
        match self.request(Method::GET, ADDRESSES_ROUTE).await {
            Ok(addrs) => Ok(Some(addrs)),
            Err(ClientError::Api { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Deploy the V1 implementation behind a fresh proxy
    pub async fn deploy_v1(&self) -> Result<DeployResponse, ClientError> {
        self.request(Method::POST, DEPLOY_V1_ROUTE).await
    }

    /// Upgrade the active proxy to the V2 implementation
    pub async fn upgrade_to_v2(&self) -> Result<UpgradeResponse, ClientError> {
        self.request(Method::POST, UPGRADE_TO_V2_ROUTE).await
    }

    /// The orchestrator's view of the chain, build, & deployment
    pub async fn status(&self) -> Result<StatusResponse, ClientError> {
        self.request(Method::GET, STATUS_ROUTE).await
    }

    /// Send a request without a body, decoding the response or the error
    /// body of a non-2xx response
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        route: &str,
    ) -> Result<T, ClientError> {
        let url = format!("{}{}", self.base_url, route);
        debug!("{} {}", method, url);

        let resp = self
            .http
            .request(method, &url)
            .send()
            .await
            .map_err(|e| ClientError::Http(e.to_string()))?;

        let status = resp.status();
        let body = resp.bytes().await.map_err(|e| ClientError::Http(e.to_string()))?;

        if !status.is_success() {
            let error = serde_json::from_slice::<ApiError>(&body)
                .map(|e| e.error)
                .unwrap_or_else(|_| String::from_utf8_lossy(&body).into_owned());
            return Err(ClientError::Api { status: status.as_u16(), error });
        }

        serde_json::from_slice(&body).map_err(|e| ClientError::Decode(e.to_string()))
    }
}
