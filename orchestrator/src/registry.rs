//! The in-memory view of the active deployment, kept consistent with the
//! durable record

use alloy::primitives::Address;
use deploy_common::types::AddressesResponse;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::{
    errors::OrchestratorError,
    store::{AddressStore, PersistedDeployment},
};

/// The active deployment
///
/// `epoch` increases every time the deployment is forgotten, so that an
/// operation started before a reset can detect it and discard its result.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeploymentState {
    /// The proxy contract, if deployed
    pub proxy: Option<Address>,
    /// The implementation behind the proxy, if known
    pub implementation: Option<Address>,
    /// The number of resets observed so far
    pub epoch: u64,
}

/// Owns the active deployment & its durable record
pub struct DeploymentRegistry {
    /// The in-memory state
    state: RwLock<DeploymentState>,
    /// The durable record
    store: AddressStore,
}

impl DeploymentRegistry {
    /// Construct the registry, seeding it from the durable record
    ///
    /// An unreadable record is logged and treated as absent.
    pub fn load(store: AddressStore) -> Self {
        let state = match store.load() {
            Ok(Some(PersistedDeployment { proxy, implementation })) => {
                info!("restored deployment: proxy {}", proxy);
                DeploymentState { proxy: Some(proxy), implementation, epoch: 0 }
            }
            Ok(None) => DeploymentState::default(),
            Err(e) => {
                warn!("ignoring unreadable deployment record at {}: {}", store.path().display(), e);
                DeploymentState::default()
            }
        };

        Self { state: RwLock::new(state), store }
    }

    /// A copy of the current state
    ///
    /// A deployment whose record has been deleted from disk is forgotten.
    pub async fn snapshot(&self) -> DeploymentState {
        let state = *self.state.read().await;
        if state.proxy.is_none() || self.record_exists().await {
            return state;
        }

        let mut state = self.state.write().await;
        self.forget_if_unrecorded(&mut state).await;
        *state
    }

    /// The active deployment, or `NotDeployed` if there is none
    pub async fn addresses(&self) -> Result<AddressesResponse, OrchestratorError> {
        let state = self.snapshot().await;
        let proxy = state.proxy.ok_or(OrchestratorError::NotDeployed)?;

        Ok(AddressesResponse { proxy, implementation: state.implementation })
    }

    /// Record a fresh deployment, replacing any previous one
    ///
    /// Fails with `StateReset` if a reset happened since `epoch` was observed.
    /// The record is persisted before memory is updated.
    pub async fn commit_deploy(
        &self,
        epoch: u64,
        proxy: Address,
        implementation: Address,
    ) -> Result<(), OrchestratorError> {
        let mut state = self.state.write().await;
        if state.epoch != epoch {
            return Err(OrchestratorError::StateReset { logs: String::new() });
        }

        let record = PersistedDeployment { proxy, implementation: Some(implementation) };
        self.with_store(move |store| store.save(&record)).await?;
        state.proxy = Some(proxy);
        state.implementation = Some(implementation);

        Ok(())
    }

    /// Record a new implementation behind `proxy`
    ///
    /// Fails with `StateReset` if a reset happened since `epoch` was observed,
    /// and with `NotDeployed` if `proxy` is no longer the active proxy or its
    /// record is gone.
    pub async fn commit_upgrade(
        &self,
        epoch: u64,
        proxy: Address,
        new_implementation: Address,
    ) -> Result<(), OrchestratorError> {
        let mut state = self.state.write().await;
        if state.epoch != epoch {
            return Err(OrchestratorError::StateReset { logs: String::new() });
        }

        self.forget_if_unrecorded(&mut state).await;
        if state.proxy != Some(proxy) {
            return Err(OrchestratorError::NotDeployed);
        }

        let record = PersistedDeployment { proxy, implementation: Some(new_implementation) };
        self.with_store(move |store| store.save(&record)).await?;
        state.implementation = Some(new_implementation);

        Ok(())
    }

    /// Forget the active deployment, in memory & on disk
    ///
    /// Failure to delete the record is logged, the in-memory state is cleared
    /// regardless.
    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        state.proxy = None;
        state.implementation = None;
        state.epoch += 1;

        match self.with_store(|store| store.clear()).await {
            Ok(true) => info!("deleted deployment record at {}", self.store.path().display()),
            Ok(false) => {}
            Err(e) => error!("error deleting deployment record: {}", e),
        }
    }

    /// Clear the deployment held in `state` if its record no longer exists
    async fn forget_if_unrecorded(&self, state: &mut DeploymentState) {
        if state.proxy.is_none() || self.record_exists().await {
            return;
        }

        warn!(
            "deployment record at {} is gone, forgetting proxy {:?}",
            self.store.path().display(),
            state.proxy
        );
        state.proxy = None;
        state.implementation = None;
    }

    /// Whether the record is on disk
    ///
    /// An error checking for it is logged & the record assumed present.
    async fn record_exists(&self) -> bool {
        self.with_store(|store| store.exists()).await.unwrap_or_else(|e| {
            warn!("error checking for deployment record: {}", e);
            true
        })
    }

    /// Run a store operation on the blocking thread pool
    async fn with_store<T, F>(&self, op: F) -> Result<T, OrchestratorError>
    where
        T: Send + 'static,
        F: FnOnce(&AddressStore) -> Result<T, OrchestratorError> + Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || op(&store))
            .await
            .map_err(|e| OrchestratorError::ReadStore(e.to_string()))?
    }
}
