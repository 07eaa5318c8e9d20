//! Request & response bodies of the orchestrator's HTTP API

use std::fmt::{self, Display};

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

/// The response to a successful V1 deployment
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployResponse {
    /// A human-readable summary of the operation
    pub message: String,
    /// The address of the freshly deployed proxy
    pub proxy: Address,
    /// The address of the V1 implementation behind the proxy
    #[serde(rename = "impl")]
    pub implementation: Address,
    /// The captured output of the deploy script
    pub logs: String,
}

/// The response to a successful upgrade
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeResponse {
    /// A human-readable summary of the operation
    pub message: String,
    /// The address of the proxy, unchanged by the upgrade
    pub proxy: Address,
    /// The address of the implementation the proxy now delegates to
    pub new_impl: Address,
    /// The captured output of the upgrade script
    pub logs: String,
}

/// The active deployment
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressesResponse {
    /// The address of the proxy
    pub proxy: Address,
    /// The address of the implementation, if known
    #[serde(rename = "impl")]
    pub implementation: Option<Address>,
}

/// The error body returned by every failing endpoint
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// A short description of the failure
    pub error: String,
    /// The captured output of the external process, when one ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<String>,
}

/// Whether the contract artifacts are available for deployment
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStatus {
    /// No build output is present
    Unbuilt,
    /// Build output is present
    Built,
    /// The last build attempt failed
    Failed,
}

impl Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildStatus::Unbuilt => write!(f, "unbuilt"),
            BuildStatus::Built => write!(f, "built"),
            BuildStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Metadata recorded after a build attempt
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRecord {
    /// The outcome of the attempt
    pub status: BuildStatus,
    /// The version string reported by the build tool, if it could be queried
    pub tool_version: Option<String>,
    /// Unix timestamp (seconds) at which the attempt finished
    pub finished_at: u64,
}

/// A snapshot of the orchestrator's view of the world
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Whether the last chain probe succeeded
    pub chain_healthy: bool,
    /// The build status derived from the project's output directories
    pub build_status: BuildStatus,
    /// The last build attempt made by this process
    pub last_build: Option<BuildRecord>,
    /// The active proxy, if deployed
    pub proxy: Option<Address>,
    /// The active implementation, if known
    #[serde(rename = "impl")]
    pub implementation: Option<Address>,
}
