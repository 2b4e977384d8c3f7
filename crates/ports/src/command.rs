//! Subprocess seam
//!
//! Providers that drive a CLI (helm, kubectl, nomad, openssl) run it
//! through this trait so tests can record invocations instead of
//! spawning processes.

use async_trait::async_trait;

use crate::error::ClientError;

#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a program to completion and capture its output. A non-zero
    /// exit status is returned as `Ok` with `success == false`; only
    /// spawn failures are errors.
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        env: &[(String, String)],
    ) -> Result<CommandOutput, ClientError>;
}
