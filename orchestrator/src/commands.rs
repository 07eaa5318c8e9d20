//! Implementations of the orchestrator's deploy & upgrade operations

use std::{path::PathBuf, sync::Arc};

use deploy_common::{
    constants::{UPGRADED_MESSAGE, V1_DEPLOYED_MESSAGE},
    types::{AddressesResponse, DeployResponse, StatusResponse, UpgradeResponse},
};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{
    build_gate::BuildGate,
    constants::{
        BROADCAST_FLAG, PRIVATE_KEY_FLAG, PROXY_ADDRESS_ENV_VAR, RPC_URL_FLAG, SCRIPT_COMMAND,
    },
    errors::OrchestratorError,
    health::ChainHealth,
    parsing::{parse_deploy_output, parse_upgrade_output},
    registry::DeploymentRegistry,
    runner::{run_blocking, CommandOutput, ForgeRunner, Invocation},
};

/// The configuration of the Forge script invocations
#[derive(Clone)]
pub struct ScriptConfig {
    /// The Forge binary
    pub forge_binary: String,
    /// The root of the Forge project, in which every command runs
    pub project_root: PathBuf,
    /// The RPC URL the scripts broadcast to
    pub rpc_url: String,
    /// The private key the scripts sign with
    pub private_key: String,
    /// The deploy script, relative to the project root
    pub deploy_script: String,
    /// The upgrade script, relative to the project root
    pub upgrade_script: String,
}

impl ScriptConfig {
    /// The invocation broadcasting `script`
    fn script_invocation(&self, script: &str) -> Invocation {
        Invocation::new(&self.forge_binary, &self.project_root)
            .arg(SCRIPT_COMMAND)
            .arg(script)
            .arg(RPC_URL_FLAG)
            .arg(&self.rpc_url)
            .arg(BROADCAST_FLAG)
            .arg(PRIVATE_KEY_FLAG)
            .arg(&self.private_key)
    }
}

/// Deploys & upgrades the proxy, keeping the registry in step with the chain
pub struct Orchestrator {
    /// The script configuration
    config: ScriptConfig,
    /// The active deployment
    registry: Arc<DeploymentRegistry>,
    /// Builds the contracts before a script runs
    build_gate: BuildGate,
    /// Runs the Forge commands
    runner: Arc<dyn ForgeRunner>,
    /// Held for the whole of a deploy or upgrade
    operation_lock: Mutex<()>,
}

impl Orchestrator {
    /// Construct an orchestrator over the given registry
    pub fn new(
        config: ScriptConfig,
        registry: Arc<DeploymentRegistry>,
        runner: Arc<dyn ForgeRunner>,
    ) -> Self {
        let build_gate = BuildGate::new(
            config.forge_binary.clone(),
            config.project_root.clone(),
            runner.clone(),
        );

        Self { config, registry, build_gate, runner, operation_lock: Mutex::new(()) }
    }

    /// The active deployment
    pub fn registry(&self) -> &Arc<DeploymentRegistry> {
        &self.registry
    }

    /// Deploy the V1 implementation behind a fresh proxy
    ///
    /// Any previous deployment is replaced.
    pub async fn deploy_initial(&self) -> Result<DeployResponse, OrchestratorError> {
        let _guard = self.operation_lock.lock().await;
        let epoch = self.registry.snapshot().await.epoch;

        self.build_gate.ensure_built().await?;

        let invocation = self.config.script_invocation(&self.config.deploy_script);
        let output = self.run_script(invocation).await?;

        let addrs = parse_deploy_output(&output)
            .ok_or(OrchestratorError::ParseFailed { logs: output.clone() })?;

        self.registry
            .commit_deploy(epoch, addrs.proxy, addrs.implementation)
            .await
            .map_err(|e| e.with_logs(&output))?;
        info!("deployed proxy {} with implementation {}", addrs.proxy, addrs.implementation);

        Ok(DeployResponse {
            message: V1_DEPLOYED_MESSAGE.to_string(),
            proxy: addrs.proxy,
            implementation: addrs.implementation,
            logs: output,
        })
    }

    /// Upgrade the active proxy to the V2 implementation
    pub async fn upgrade_to_next(&self) -> Result<UpgradeResponse, OrchestratorError> {
        let _guard = self.operation_lock.lock().await;
        let state = self.registry.snapshot().await;
        let proxy = state.proxy.ok_or(OrchestratorError::NotDeployed)?;

        self.build_gate.ensure_built().await?;

        let invocation = self
            .config
            .script_invocation(&self.config.upgrade_script)
            .env(PROXY_ADDRESS_ENV_VAR, proxy.to_string());
        let output = self.run_script(invocation).await?;

        let new_impl = parse_upgrade_output(&output)
            .ok_or(OrchestratorError::UpgradeParseFailed { logs: output.clone() })?;

        self.registry
            .commit_upgrade(state.epoch, proxy, new_impl)
            .await
            .map_err(|e| e.with_logs(&output))?;
        info!("upgraded proxy {} to implementation {}", proxy, new_impl);

        Ok(UpgradeResponse {
            message: UPGRADED_MESSAGE.to_string(),
            proxy,
            new_impl,
            logs: output,
        })
    }

    /// The active deployment, or `NotDeployed` if there is none
    pub async fn get_addresses(&self) -> Result<AddressesResponse, OrchestratorError> {
        self.registry.addresses().await
    }

    /// A snapshot of the deployment & build state
    pub async fn status(&self, chain_health: ChainHealth) -> StatusResponse {
        let state = self.registry.snapshot().await;

        StatusResponse {
            chain_healthy: chain_health.is_healthy(),
            build_status: self.build_gate.status().await,
            last_build: self.build_gate.last_build().await,
            proxy: state.proxy,
            implementation: state.implementation,
        }
    }

    /// Run a script, returning its output if it exited successfully
    async fn run_script(&self, invocation: Invocation) -> Result<String, OrchestratorError> {
        let rendered = invocation.to_string();
        info!("running `{}`", rendered);

        let CommandOutput { success, status, output } =
            run_blocking(self.runner.clone(), invocation).await?;
        if !success {
            warn!("`{}` failed with {}", rendered, status);
            return Err(OrchestratorError::ScriptFailed {
                reason: format!("script failed with {}", status),
                logs: output,
            });
        }

        Ok(output)
    }
}
