//! Definitions of the CLI arguments configuring the orchestrator
//!
//! Every argument can also be provided through the environment, which is
//! populated from a `.env` file when one is present.

use std::{path::PathBuf, time::Duration};

use clap::Parser;

use crate::{
    commands::ScriptConfig,
    constants::{
        DEFAULT_HEALTH_CHECK_INTERVAL_MS, DEFAULT_PORT, DEFAULT_PROXY_FILE_PATH, DEFAULT_RPC_URL,
        FORGE_COMMAND,
    },
};

/// Serve the deployment & upgrade lifecycle of the `AssetToken` proxy over HTTP
#[derive(Parser, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Port on which to serve the HTTP API
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Network RPC URL
    #[arg(short, long, env = "RPC_URL", default_value = DEFAULT_RPC_URL)]
    pub rpc_url: String,

    /// Private key of the deployer
    #[arg(short, long, env = "PRIVATE_KEY", hide_env_values = true)]
    pub private_key: String,

    /// Path of the file recording the active deployment
    #[arg(long, env = "PROXY_FILE_PATH", default_value = DEFAULT_PROXY_FILE_PATH)]
    pub proxy_file_path: PathBuf,

    /// Forge script deploying the V1 implementation behind a proxy
    #[arg(long, env = "DEPLOY_SCRIPT_PATH")]
    pub deploy_script_path: String,

    /// Forge script upgrading the proxy to the V2 implementation
    #[arg(long, env = "UPGRADE_SCRIPT_PATH")]
    pub upgrade_script_path: String,

    /// Root of the Forge project containing the contracts & scripts
    #[arg(long, env = "FORGE_PROJECT_PATH")]
    pub forge_project_path: PathBuf,

    /// Interval between chain health probes, in milliseconds
    #[arg(
        long,
        env = "HEALTH_CHECK_INTERVAL_MS",
        default_value_t = DEFAULT_HEALTH_CHECK_INTERVAL_MS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub health_check_interval_ms: u64,

    /// The Forge binary to invoke
    #[arg(long, env = "FORGE_BINARY", default_value = FORGE_COMMAND)]
    pub forge_binary: String,
}

impl Cli {
    /// The configuration of the Forge invocations
    pub fn script_config(&self) -> ScriptConfig {
        ScriptConfig {
            forge_binary: self.forge_binary.clone(),
            project_root: self.forge_project_path.clone(),
            rpc_url: self.rpc_url.clone(),
            private_key: self.private_key.clone(),
            deploy_script: self.deploy_script_path.clone(),
            upgrade_script: self.upgrade_script_path.clone(),
        }
    }

    /// The interval between chain health probes
    pub fn health_check_interval(&self) -> Duration {
        Duration::from_millis(self.health_check_interval_ms)
    }
}
