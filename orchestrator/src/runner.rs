//! Invocation of the external Forge toolchain

use std::{
    fmt::{self, Display},
    path::PathBuf,
    process::{Command, Stdio},
    sync::Arc,
};

use tracing::debug;

use crate::{constants::PRIVATE_KEY_FLAG, errors::OrchestratorError};

/// A single invocation of an external command
#[derive(Clone, PartialEq, Eq)]
pub struct Invocation {
    /// The program to run
    pub program: String,
    /// The arguments passed to the program
    pub args: Vec<String>,
    /// Extra environment variables set for the program
    pub envs: Vec<(String, String)>,
    /// The working directory of the program
    pub cwd: PathBuf,
}

impl Invocation {
    /// An invocation of `program` in `cwd` with no arguments
    pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self { program: program.into(), args: Vec::new(), envs: Vec::new(), cwd: cwd.into() }
    }

    /// Append an argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Set an environment variable
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }
}

impl Display for Invocation {
    /// Renders the command line with the private key redacted
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.envs {
            write!(f, "{}={} ", key, value)?;
        }
        write!(f, "{}", self.program)?;

        let mut redact_next = false;
        for arg in &self.args {
            if redact_next {
                write!(f, " <redacted>")?;
            } else {
                write!(f, " {}", arg)?;
            }
            redact_next = arg == PRIVATE_KEY_FLAG;
        }
        Ok(())
    }
}

/// The result of a command that ran to completion
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandOutput {
    /// Whether the command exited successfully
    pub success: bool,
    /// A description of the exit status
    pub status: String,
    /// Standard output followed by standard error
    pub output: String,
}

impl CommandOutput {
    /// The output of a command that exited successfully
    pub fn success(output: impl Into<String>) -> Self {
        Self { success: true, status: "exit status: 0".to_string(), output: output.into() }
    }

    /// The output of a command that exited with the given code
    pub fn failure(code: i32, output: impl Into<String>) -> Self {
        Self { success: false, status: format!("exit status: {}", code), output: output.into() }
    }
}

/// Runs external commands on behalf of the orchestrator
///
/// Implementations block until the command exits. An `Err` means the command
/// could not be run at all; a command that ran and failed is reported through
/// [`CommandOutput::success`].
pub trait ForgeRunner: Send + Sync {
    /// Run the invocation to completion, capturing its output
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput, OrchestratorError>;
}

/// Runs commands as child processes of the orchestrator
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessRunner;

impl ForgeRunner for ProcessRunner {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput, OrchestratorError> {
        debug!("running `{}`", invocation);

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .envs(invocation.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(&invocation.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let output = cmd.output().map_err(|e| {
            OrchestratorError::CommandSpawn(format!("{}: {}", invocation.program, e))
        })?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(CommandOutput {
            success: output.status.success(),
            status: output.status.to_string(),
            output: text,
        })
    }
}

/// Run the invocation on the blocking thread pool
pub async fn run_blocking(
    runner: Arc<dyn ForgeRunner>,
    invocation: Invocation,
) -> Result<CommandOutput, OrchestratorError> {
    tokio::task::spawn_blocking(move || runner.run(&invocation))
        .await
        .map_err(|e| OrchestratorError::CommandSpawn(e.to_string()))?
}
