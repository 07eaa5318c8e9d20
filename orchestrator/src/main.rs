use std::sync::Arc;

use clap::Parser;
use orchestrator::{
    cli::Cli,
    commands::Orchestrator,
    health::{HealthMonitor, RpcProbe},
    registry::DeploymentRegistry,
    runner::ProcessRunner,
    server::{run_server, AppState},
    store::AddressStore,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let env_file = dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
    if let Some(path) = env_file {
        info!("loaded environment from {}", path.display());
    }

    let registry = Arc::new(DeploymentRegistry::load(AddressStore::new(&cli.proxy_file_path)));
    let orchestrator =
        Arc::new(Orchestrator::new(cli.script_config(), registry.clone(), Arc::new(ProcessRunner)));

    let interval = cli.health_check_interval();
    let probe = RpcProbe::new(&cli.rpc_url, interval)?;
    let (monitor, chain_health) = HealthMonitor::new(probe, registry, interval);

    let cancel = CancellationToken::new();
    let monitor_handle = monitor.spawn(cancel.clone());

    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("error listening for shutdown signal: {}", e);
            }
            info!("shutting down");
            cancel.cancel();
        }
    });

    let state = AppState { orchestrator, chain_health };
    let res = run_server(cli.port, state, cancel.clone()).await;

    cancel.cancel();
    monitor_handle.await?;
    res.map_err(Into::into)
}
