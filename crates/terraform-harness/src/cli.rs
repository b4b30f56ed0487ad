//! Terraform CLI invocation
//!
//! `TerraformCli` abstracts running the `terraform` binary so the
//! workspace logic can be unit tested against a mock.

use crate::error::TerraformError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Captured result of one terraform invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when killed by a signal
    pub status: Option<i32>,
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
}

impl CommandOutput {
    /// Exit code was zero
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Runs terraform commands
///
/// All methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait]
pub trait TerraformCli: Send + Sync {
    /// Run `terraform <args>` in `dir` with the extra environment `env`
    async fn run(
        &self,
        dir: &Path,
        args: &[&str],
        env: &[(String, String)],
    ) -> Result<CommandOutput, TerraformError>;
}

/// Runs the real terraform binary with a per-command timeout
#[derive(Debug, Clone)]
pub struct CommandRunner {
    binary: PathBuf,
    timeout: Duration,
}

impl CommandRunner {
    /// Create a runner for `binary`
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }
}

#[async_trait]
impl TerraformCli for CommandRunner {
    async fn run(
        &self,
        dir: &Path,
        args: &[&str],
        env: &[(String, String)],
    ) -> Result<CommandOutput, TerraformError> {
        let operation = args.first().copied().unwrap_or("terraform");
        debug!(dir = %dir.display(), ?args, "running terraform");

        let mut command = Command::new(&self.binary);
        command
            .args(args)
            .current_dir(dir)
            .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .env("TF_IN_AUTOMATION", "1")
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| TerraformError::Timeout(operation.to_string(), self.timeout))??;

        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
