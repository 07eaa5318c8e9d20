//! Definitions of errors that can occur while orchestrating deployments

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

/// Errors that can occur while building, deploying, or upgrading the contracts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorError {
    /// The contract build failed, the operation was aborted before deploying
    BuildFailed(String),
    /// The deploy script ran but its output did not contain both addresses
    ParseFailed {
        /// The captured output of the deploy script
        logs: String,
    },
    /// The upgrade script ran but its output did not contain the new implementation
    UpgradeParseFailed {
        /// The captured output of the upgrade script
        logs: String,
    },
    /// No proxy has been deployed, or the deployment was forgotten after a chain outage
    NotDeployed,
    /// A deploy or upgrade script exited unsuccessfully
    ScriptFailed {
        /// The script & exit status
        reason: String,
        /// The captured output of the script
        logs: String,
    },
    /// The chain became unreachable while the script was running, so its
    /// result was discarded
    StateReset {
        /// The captured output of the script
        logs: String,
    },
    /// Error writing the deployment record
    Persist {
        /// The underlying I/O or serialization error
        reason: String,
        /// The captured output of the script, kept for manual recovery
        logs: String,
    },
    /// Error reading the deployment record
    ReadStore(String),
    /// Error spawning an external command
    CommandSpawn(String),
    /// Error initializing the RPC client
    ClientInitialization(String),
    /// Error binding or running the HTTP server
    Server(String),
}

impl OrchestratorError {
    /// Attach the captured script output to the variants that carry it
    pub fn with_logs(self, output: &str) -> Self {
        match self {
            OrchestratorError::ParseFailed { .. } => {
                OrchestratorError::ParseFailed { logs: output.to_string() }
            }
            OrchestratorError::UpgradeParseFailed { .. } => {
                OrchestratorError::UpgradeParseFailed { logs: output.to_string() }
            }
            OrchestratorError::ScriptFailed { reason, .. } => {
                OrchestratorError::ScriptFailed { reason, logs: output.to_string() }
            }
            OrchestratorError::StateReset { .. } => {
                OrchestratorError::StateReset { logs: output.to_string() }
            }
            OrchestratorError::Persist { reason, .. } => {
                OrchestratorError::Persist { reason, logs: output.to_string() }
            }
            other => other,
        }
    }

    /// The captured script output, if the error occurred after a script ran
    pub fn logs(&self) -> Option<&str> {
        match self {
            OrchestratorError::ParseFailed { logs }
            | OrchestratorError::UpgradeParseFailed { logs }
            | OrchestratorError::ScriptFailed { logs, .. }
            | OrchestratorError::StateReset { logs }
            | OrchestratorError::Persist { logs, .. } => Some(logs.as_str()),
            _ => None,
        }
    }
}

impl Display for OrchestratorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            OrchestratorError::BuildFailed(_) => write!(f, "Forge build failed"),
            OrchestratorError::ParseFailed { .. } => write!(f, "Deployment parsing failed"),
            OrchestratorError::UpgradeParseFailed { .. } => write!(f, "Upgrade failed"),
            OrchestratorError::NotDeployed => write!(f, "Not deployed"),
            OrchestratorError::ScriptFailed { reason, .. } => write!(f, "{}", reason),
            OrchestratorError::StateReset { .. } => {
                write!(f, "chain became unreachable during the operation, result discarded")
            }
            OrchestratorError::Persist { reason, .. } => {
                write!(f, "error persisting deployment: {}", reason)
            }
            OrchestratorError::ReadStore(s) => write!(f, "error reading deployment: {}", s),
            OrchestratorError::CommandSpawn(s) => write!(f, "error running command: {}", s),
            OrchestratorError::ClientInitialization(s) => {
                write!(f, "error initializing client: {}", s)
            }
            OrchestratorError::Server(s) => write!(f, "server error: {}", s),
        }
    }
}

impl Error for OrchestratorError {}
