//! Subprocess runner backed by tokio

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use drydock_ports::{ClientError, CommandOutput, CommandRunner};

/// Runs helper CLIs (helm, kubectl, docker, openssl) to completion and
/// captures their output.
#[derive(Debug, Clone, Default)]
pub struct TokioCommandRunner;

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        env: &[(String, String)],
    ) -> Result<CommandOutput, ClientError> {
        debug!(program, ?args, "running command");

        let output = Command::new(program)
            .args(args)
            .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ClientError::Command {
                command: program.to_string(),
                message: e.to_string(),
            })?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
        })
    }
}
