//! Running cluster administration commands.
//!
//! The reconciler never spawns processes itself; it goes through a
//! [`CommandExecutor`] so tests can script the cluster's answers.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use ceph_client_core::CephConfig;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Exit status the ceph CLI uses for `ENOENT`.
const ENOENT_EXIT_CODE: i32 = 2;

/// Failure to run a command or a non-zero exit.
#[derive(Debug, Clone, Error)]
pub enum CommandError {
    #[error("failed to start '{command}': {reason}")]
    Spawn { command: String, reason: String },
    #[error("'{command}' exited with {exit_code:?}: {stderr}")]
    Failed {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },
    #[error("'{command}' did not finish within {timeout:?}")]
    TimedOut { command: String, timeout: Duration },
    #[error("failed to write output to '{path}': {reason}")]
    OutputFile { path: PathBuf, reason: String },
}

impl CommandError {
    /// The command ran and reported that its target does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Failed {
                exit_code, stderr, ..
            } => *exit_code == Some(ENOENT_EXIT_CODE) || stderr.contains("ENOENT"),
            Self::Spawn { .. } | Self::TimedOut { .. } | Self::OutputFile { .. } => false,
        }
    }
}

/// Process-execution collaborator.
///
/// Returns the command's stdout on success; `Err` exactly when the command
/// failed. When `outfile` is given the output is also written there.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute_with_output_file(
        &self,
        action_name: &str,
        command: &str,
        outfile: Option<&Path>,
        args: &[String],
    ) -> Result<String, CommandError>;
}

/// Executor backed by `tokio::process`.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    timeout: Duration,
}

impl ProcessExecutor {
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    #[must_use]
    pub const fn from_config(config: &CephConfig) -> Self {
        Self::new(Duration::from_secs(config.command_timeout_secs))
    }
}

#[async_trait]
impl CommandExecutor for ProcessExecutor {
    async fn execute_with_output_file(
        &self,
        action_name: &str,
        command: &str,
        outfile: Option<&Path>,
        args: &[String],
    ) -> Result<String, CommandError> {
        debug!(action = action_name, command, ?args, "Running command");

        let child = Command::new(command)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| CommandError::TimedOut {
                command: command.to_string(),
                timeout: self.timeout,
            })?
            .map_err(|e| CommandError::Spawn {
                command: command.to_string(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(CommandError::Failed {
                command: command.to_string(),
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();

        if let Some(path) = outfile {
            tokio::fs::write(path, &stdout)
                .await
                .map_err(|e| CommandError::OutputFile {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })?;
        }

        Ok(stdout)
    }
}
