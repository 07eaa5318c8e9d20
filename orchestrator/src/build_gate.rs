//! Ensures the contracts are compiled before any script runs against them

use std::{
    path::PathBuf,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use deploy_common::types::{BuildRecord, BuildStatus};
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info};

use crate::{
    constants::{BUILD_COMMAND, CACHE_DIR, OUT_DIR, VERSION_FLAG},
    errors::OrchestratorError,
    runner::{run_blocking, ForgeRunner, Invocation},
};

/// What `ensure_built` had to do
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildOutcome {
    /// Build output was already present
    AlreadyBuilt,
    /// A build ran & succeeded
    Built,
}

/// Compiles the Forge project on demand
pub struct BuildGate {
    /// The Forge binary
    forge_binary: String,
    /// The root of the Forge project
    project_root: PathBuf,
    /// Runs the Forge commands
    runner: Arc<dyn ForgeRunner>,
    /// Held while a build runs
    build_lock: Mutex<()>,
    /// The last build attempt made by this process, written once a build ends
    last_build: RwLock<Option<BuildRecord>>,
}

impl BuildGate {
    /// Construct a gate over the project at `project_root`
    pub fn new(
        forge_binary: impl Into<String>,
        project_root: impl Into<PathBuf>,
        runner: Arc<dyn ForgeRunner>,
    ) -> Self {
        Self {
            forge_binary: forge_binary.into(),
            project_root: project_root.into(),
            runner,
            build_lock: Mutex::new(()),
            last_build: RwLock::new(None),
        }
    }

    /// Whether both build output directories exist
    pub fn is_built(&self) -> bool {
        self.project_root.join(OUT_DIR).is_dir() && self.project_root.join(CACHE_DIR).is_dir()
    }

    /// The build status, derived from the output directories & the last attempt
    pub async fn status(&self) -> BuildStatus {
        if self.is_built() {
            return BuildStatus::Built;
        }

        match &*self.last_build.read().await {
            Some(BuildRecord { status: BuildStatus::Failed, .. }) => BuildStatus::Failed,
            _ => BuildStatus::Unbuilt,
        }
    }

    /// The last build attempt made by this process
    pub async fn last_build(&self) -> Option<BuildRecord> {
        self.last_build.read().await.clone()
    }

    /// Build the project unless build output is already present
    ///
    /// Concurrent callers are serialized, so at most one build runs at a time.
    /// Readers of the build status never wait on a running build.
    pub async fn ensure_built(&self) -> Result<BuildOutcome, OrchestratorError> {
        let _build_guard = self.build_lock.lock().await;
        if self.is_built() {
            return Ok(BuildOutcome::AlreadyBuilt);
        }

        info!("build output missing, building contracts in {}", self.project_root.display());
        let res = self.build().await;

        let (status, tool_version) = match &res {
            Ok(version) => (BuildStatus::Built, Some(version.clone())),
            Err((version, _)) => (BuildStatus::Failed, version.clone()),
        };
        let record = BuildRecord { status, tool_version, finished_at: unix_now() };
        *self.last_build.write().await = Some(record);

        match res {
            Ok(_) => Ok(BuildOutcome::Built),
            Err((_, e)) => {
                error!("contract build failed: {}", e);
                Err(e)
            }
        }
    }

    /// Query the tool version then build, returning the version on success
    ///
    /// On failure, the version is returned alongside the error if it was
    /// obtained.
    async fn build(&self) -> Result<String, (Option<String>, OrchestratorError)> {
        let version_cmd =
            Invocation::new(&self.forge_binary, &self.project_root).arg(VERSION_FLAG);
        let version = run_blocking(self.runner.clone(), version_cmd)
            .await
            .map_err(|e| (None, OrchestratorError::BuildFailed(e.to_string())))?;
        if !version.success {
            return Err((None, OrchestratorError::BuildFailed(version.output)));
        }

        let version = version.output.trim().to_string();
        info!("using {}", version);

        let build_cmd = Invocation::new(&self.forge_binary, &self.project_root).arg(BUILD_COMMAND);
        let build = run_blocking(self.runner.clone(), build_cmd)
            .await
            .map_err(|e| (Some(version.clone()), OrchestratorError::BuildFailed(e.to_string())))?;
        if !build.success {
            return Err((Some(version), OrchestratorError::BuildFailed(build.output)));
        }

        Ok(version)
    }
}

/// The current unix timestamp in seconds
fn unix_now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or_default()
}
