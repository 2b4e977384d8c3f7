//! Shared test doubles for the client seams

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use drydock_core::specs::Image;
use drydock_ports::{
    ClientError, Clients, CommandOutput, CommandRunner, ContainerConfig, ContainerRuntime,
    HttpChecker, LogFrameStream, LogStreamOptions,
};

/// Container runtime double: every operation succeeds and nothing
/// exists.
pub struct MockRuntime;

#[async_trait]
impl ContainerRuntime for MockRuntime {
    async fn pull_image(&self, _image: &Image) -> Result<(), ClientError> {
        Ok(())
    }

    async fn create_network(&self, _name: &str, _subnet: &str) -> Result<String, ClientError> {
        Ok("net-1".to_string())
    }

    async fn remove_network(&self, _name: &str) -> Result<(), ClientError> {
        Ok(())
    }

    async fn find_network(&self, _name: &str) -> Result<Option<String>, ClientError> {
        Ok(None)
    }

    async fn create_container(&self, _config: &ContainerConfig) -> Result<String, ClientError> {
        Ok("container-1".to_string())
    }

    async fn remove_container(&self, _name: &str) -> Result<(), ClientError> {
        Ok(())
    }

    async fn find_container(&self, _name: &str) -> Result<Option<String>, ClientError> {
        Ok(None)
    }

    async fn container_logs(
        &self,
        _name: &str,
        _options: LogStreamOptions,
    ) -> Result<LogFrameStream, ClientError> {
        Ok(Box::pin(futures::stream::empty()))
    }
}

/// Command runner double: records every invocation and replays scripted
/// results, succeeding once the script runs out.
#[derive(Default)]
pub struct ScriptedRunner {
    pub calls: Mutex<Vec<(String, Vec<String>)>>,
    script: Mutex<VecDeque<CommandOutput>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_failure(&self, stderr: &str) {
        self.script.lock().push_back(CommandOutput {
            stdout: String::new(),
            stderr: stderr.to_string(),
            success: false,
        });
    }

    pub fn push_success(&self) {
        self.script.lock().push_back(CommandOutput {
            success: true,
            ..Default::default()
        });
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        _env: &[(String, String)],
    ) -> Result<CommandOutput, ClientError> {
        self.calls.lock().push((
            program.to_string(),
            args.iter().map(|a| a.to_string()).collect(),
        ));

        Ok(self.script.lock().pop_front().unwrap_or(CommandOutput {
            success: true,
            ..Default::default()
        }))
    }
}

/// Health checker double: always healthy.
pub struct OkChecker;

#[async_trait]
impl HttpChecker for OkChecker {
    async fn wait_healthy(&self, _url: &str, _timeout: Duration) -> Result<(), ClientError> {
        Ok(())
    }
}

pub fn mock_clients() -> (Clients, Arc<ScriptedRunner>) {
    let runner = Arc::new(ScriptedRunner::new());
    let clients = Clients {
        runtime: Arc::new(MockRuntime),
        command: runner.clone(),
        http: Arc::new(OkChecker),
    };
    (clients, runner)
}
