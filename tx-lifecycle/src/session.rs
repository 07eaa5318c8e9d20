//! The client's view of the active deployment

use std::sync::Arc;

use alloy::primitives::Address;
use async_trait::async_trait;
use deploy_common::types::{AddressesResponse, DeployResponse, UpgradeResponse};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::{client::OrchestratorClient, errors::ClientError, reads::ReadCache, state::RefreshHooks};

/// Tracks the deployment reported by the orchestrator & owns the read cache
/// that must be dropped whenever the deployment or the chain changes
pub struct Session {
    /// The orchestrator
    client: OrchestratorClient,
    /// The last known deployment
    known: RwLock<Option<AddressesResponse>>,
    /// Contract reads, keyed without the proxy
    cache: Arc<ReadCache>,
}

impl Session {
    /// A session with no known deployment
    pub fn new(client: OrchestratorClient, cache: Arc<ReadCache>) -> Self {
        Self { client, known: RwLock::new(None), cache }
    }

    /// The read cache
    pub fn cache(&self) -> &Arc<ReadCache> {
        &self.cache
    }

    /// The known proxy
    pub async fn proxy(&self) -> Option<Address> {
        self.known.read().await.as_ref().map(|a| a.proxy)
    }

    /// The known implementation
    pub async fn implementation(&self) -> Option<Address> {
        self.known.read().await.as_ref().and_then(|a| a.implementation)
    }

    /// Re-fetch the deployment from the orchestrator
    pub async fn refresh_addresses(&self) -> Result<Option<AddressesResponse>, ClientError> {
        let addrs = self.client.addresses().await?;
        self.set_known(addrs.clone()).await;
        Ok(addrs)
    }

    /// Ask the orchestrator to deploy V1, adopting the new deployment
    pub async fn deploy_v1(&self) -> Result<DeployResponse, ClientError> {
        let resp = self.client.deploy_v1().await?;
        info!("deployed proxy {}", resp.proxy);

        let addrs =
            AddressesResponse { proxy: resp.proxy, implementation: Some(resp.implementation) };
        self.set_known(Some(addrs)).await;
        Ok(resp)
    }

    /// Ask the orchestrator to upgrade to V2, adopting the new implementation
    pub async fn upgrade_to_v2(&self) -> Result<UpgradeResponse, ClientError> {
        let resp = self.client.upgrade_to_v2().await?;
        info!("upgraded proxy {} to {}", resp.proxy, resp.new_impl);

        let addrs = AddressesResponse { proxy: resp.proxy, implementation: Some(resp.new_impl) };
        self.set_known(Some(addrs)).await;
        Ok(resp)
    }

    /// Replace the known deployment, dropping cached reads if it changed
    async fn set_known(&self, addrs: Option<AddressesResponse>) {
        let mut known = self.known.write().await;
        if *known != addrs {
            self.cache.invalidate_all();
        }
        *known = addrs;
    }
}

#[async_trait]
impl RefreshHooks for Session {
    async fn refresh(&self) {
        if let Err(e) = self.refresh_addresses().await {
            warn!("error refreshing deployment: {}", e);
        }
        self.cache.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use alloy::primitives::address;
    use mockito::Server;

    use super::Session;
    use crate::{
        client::OrchestratorClient,
        reads::{ReadCache, ReadKey, ReadValue},
        state::RefreshHooks,
    };

    const ADDRESSES_BODY: &str = r#"{"proxy":"0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb","impl":"0xcccccccccccccccccccccccccccccccccccccccc"}"#;

    #[tokio::test]
    async fn test_refresh_fetches_addresses_and_clears_cache() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/addresses")
            .with_status(200)
            .with_body(ADDRESSES_BODY)
            .expect(1)
            .create_async()
            .await;

        let cache = Arc::new(ReadCache::new());
        cache.insert(ReadKey::Paused, ReadValue::Bool(true));
        let session = Session::new(OrchestratorClient::new(server.url()), cache.clone());

        session.refresh().await;

        assert_eq!(
            session.proxy().await,
            Some(address!("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb"))
        );
        assert_eq!(
            session.implementation().await,
            Some(address!("cccccccccccccccccccccccccccccccccccccccc"))
        );
        assert!(cache.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_refresh_forgets_reset_deployment() {
        let mut server = Server::new_async().await;
        let _deployed = server
            .mock("POST", "/deploy-v1")
            .with_status(200)
            .with_body(
                r#"{"message":"V1 deployed","proxy":"0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb","impl":"0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa","logs":""}"#,
            )
            .create_async()
            .await;
        let _not_deployed = server
            .mock("GET", "/addresses")
            .with_status(404)
            .with_body(r#"{"error":"Not deployed"}"#)
            .create_async()
            .await;

        let session =
            Session::new(OrchestratorClient::new(server.url()), Arc::new(ReadCache::new()));
        session.deploy_v1().await.unwrap();
        assert!(session.proxy().await.is_some());

        session.refresh().await;
        assert_eq!(session.proxy().await, None);
    }

    #[tokio::test]
    async fn test_refresh_keeps_deployment_when_orchestrator_unreachable() {
        let mut server = Server::new_async().await;
        let _deployed = server
            .mock("POST", "/deploy-v1")
            .with_status(200)
            .with_body(
                r#"{"message":"V1 deployed","proxy":"0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb","impl":"0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa","logs":""}"#,
            )
            .create_async()
            .await;
        let _failing = server
            .mock("GET", "/addresses")
            .with_status(500)
            .with_body(r#"{"error":"server error"}"#)
            .create_async()
            .await;

        let cache = Arc::new(ReadCache::new());
        let session = Session::new(OrchestratorClient::new(server.url()), cache.clone());
        session.deploy_v1().await.unwrap();
        cache.insert(ReadKey::Version, ReadValue::Version(1));

        session.refresh().await;

        assert_eq!(
            session.proxy().await,
            Some(address!("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb"))
        );
        assert!(cache.is_empty());
    }
}
