//! Periodic probing of the chain, forgetting the deployment when the chain
//! goes away
//!
//! A local development chain loses all of its state when restarted, so a
//! deployment recorded before an outage cannot be assumed to exist after it.

use std::{sync::Arc, time::Duration};

use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::transports::http::reqwest::Url;
use async_trait::async_trait;
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{errors::OrchestratorError, registry::DeploymentRegistry};

/// The last observed health of the chain
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChainHealth {
    /// The last probe succeeded
    Healthy,
    /// The last probe failed
    Unhealthy,
}

impl ChainHealth {
    /// Transition on a probe result
    ///
    /// Returns the new health and whether this probe is the first failure
    /// after a success, which is the only transition that forgets the
    /// deployment.
    pub fn observe(self, probe_succeeded: bool) -> (ChainHealth, bool) {
        match (self, probe_succeeded) {
            (_, true) => (ChainHealth::Healthy, false),
            (ChainHealth::Healthy, false) => (ChainHealth::Unhealthy, true),
            (ChainHealth::Unhealthy, false) => (ChainHealth::Unhealthy, false),
        }
    }

    /// Whether the chain is healthy
    pub fn is_healthy(self) -> bool {
        self == ChainHealth::Healthy
    }
}

/// A check of whether the chain is reachable
#[async_trait]
pub trait ChainProbe: Send + Sync {
    /// Whether the chain answered
    async fn is_healthy(&self) -> bool;
}

/// Probes the chain by requesting the latest block number over JSON-RPC
pub struct RpcProbe {
    /// The RPC client
    provider: DynProvider,
    /// The timeout applied to each request
    timeout: Duration,
}

impl RpcProbe {
    /// Construct a probe of the node at `rpc_url`
    pub fn new(rpc_url: &str, timeout: Duration) -> Result<Self, OrchestratorError> {
        let url = Url::parse(rpc_url)
            .map_err(|e| OrchestratorError::ClientInitialization(e.to_string()))?;
        let provider = DynProvider::new(ProviderBuilder::new().on_http(url));

        Ok(Self { provider, timeout })
    }
}

#[async_trait]
impl ChainProbe for RpcProbe {
    async fn is_healthy(&self) -> bool {
        match tokio::time::timeout(self.timeout, self.provider.get_block_number()).await {
            Ok(Ok(block)) => {
                debug!("chain head at block {}", block);
                true
            }
            Ok(Err(e)) => {
                debug!("chain probe failed: {}", e);
                false
            }
            Err(_) => {
                debug!("chain probe timed out");
                false
            }
        }
    }
}

/// Probes the chain on an interval & resets the registry on a
/// healthy-to-unhealthy transition
pub struct HealthMonitor<P: ChainProbe> {
    /// The probe
    probe: P,
    /// The registry reset on an outage
    registry: Arc<DeploymentRegistry>,
    /// The interval between probes
    interval: Duration,
    /// The last observed health, published to readers
    health_tx: watch::Sender<ChainHealth>,
}

impl<P: ChainProbe + 'static> HealthMonitor<P> {
    /// Construct a monitor, returning a receiver of the observed health
    ///
    /// The chain is assumed healthy until the first probe says otherwise.
    pub fn new(
        probe: P,
        registry: Arc<DeploymentRegistry>,
        interval: Duration,
    ) -> (Self, watch::Receiver<ChainHealth>) {
        let (health_tx, health_rx) = watch::channel(ChainHealth::Healthy);
        (Self { probe, registry, interval, health_tx }, health_rx)
    }

    /// Probe once & apply the transition
    pub async fn tick(&self) {
        let healthy = self.probe.is_healthy().await;
        let (next, reset) = self.health_tx.borrow().observe(healthy);

        if reset {
            warn!("chain became unreachable, forgetting deployment");
            self.registry.reset().await;
        }

        self.health_tx.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            if next.is_healthy() {
                info!("chain is reachable");
            }

            *current = next;
            true
        });
    }

    /// Probe on the configured interval until `cancel` fires
    ///
    /// The first probe happens one interval after spawning. Probes never
    /// overlap, a slow probe delays the next one.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("health monitor stopped");
                        break;
                    }
                    _ = ticker.tick() => self.tick().await,
                }
            }
        })
    }
}
