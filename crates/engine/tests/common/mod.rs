//! Shared harness for engine integration tests
//!
//! Mirrors the production wiring with recording doubles: a provider
//! factory that hands out mock providers scripted to fail for chosen
//! resource names, client stubs, and a locked scratch home directory so
//! tests cannot see each other's state files.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, MutexGuard};

use drydock_core::specs::Image;
use drydock_core::{paths, Resource, ResourceSet};
use drydock_ports::{
    ClientError, Clients, CommandOutput, CommandRunner, ContainerConfig, ContainerRuntime,
    HttpChecker, LogFrameStream, LogStreamOptions, Provider, ProviderError, ProviderFactory,
};

static HOME_LOCK: Mutex<()> = Mutex::new(());

/// Scratch drydock home. Holding it serializes the tests that touch the
/// state file and keeps `DRYDOCK_HOME` pointed at a private directory.
pub struct TestHome {
    pub dir: tempfile::TempDir,
    _guard: MutexGuard<'static, ()>,
}

pub fn test_home(state: Option<&str>) -> TestHome {
    let guard = HOME_LOCK.lock();
    let dir = tempfile::tempdir().unwrap();
    std::env::set_var(paths::HOME_ENV, dir.path());

    if let Some(state) = state {
        std::fs::create_dir_all(paths::state_dir()).unwrap();
        std::fs::write(paths::state_path(), state).unwrap();
    }

    TestHome { dir, _guard: guard }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Create,
    Destroy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub name: String,
    pub op: Op,
}

/// Pair of signals letting a test hold a provider mid-create.
#[derive(Clone, Default)]
pub struct Gate {
    pub started: Arc<tokio::sync::Notify>,
    pub release: Arc<tokio::sync::Notify>,
}

/// Factory double handing out recording providers. Providers fail both
/// create and destroy for any resource name in `failures`, the way the
/// original engine tests script their provider mocks.
#[derive(Default)]
pub struct MockFactory {
    pub calls: Arc<Mutex<Vec<Call>>>,
    pub failures: HashMap<String, String>,
    pub gates: HashMap<String, Gate>,
}

impl MockFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(failures: &[(&str, &str)]) -> Self {
        Self {
            failures: failures
                .iter()
                .map(|(name, msg)| (name.to_string(), msg.to_string()))
                .collect(),
            ..Self::default()
        }
    }

    pub fn gate_for(&mut self, name: &str) -> Gate {
        let gate = Gate::default();
        self.gates.insert(name.to_string(), gate.clone());
        gate
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn count(&self, op: Op) -> usize {
        self.calls.lock().iter().filter(|c| c.op == op).count()
    }

    pub fn names_for(&self, op: Op) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.op == op)
            .map(|c| c.name.clone())
            .collect()
    }
}

impl ProviderFactory for MockFactory {
    fn provider_for(
        &self,
        resource: &Resource,
        _set: &ResourceSet,
    ) -> Result<Arc<dyn Provider>, ProviderError> {
        Ok(Arc::new(MockProvider {
            name: resource.name.clone(),
            calls: self.calls.clone(),
            failure: self.failures.get(&resource.name).cloned(),
            gate: self.gates.get(&resource.name).cloned(),
        }))
    }
}

pub struct MockProvider {
    name: String,
    calls: Arc<Mutex<Vec<Call>>>,
    failure: Option<String>,
    gate: Option<Gate>,
}

impl MockProvider {
    async fn record(&self, op: Op) -> Result<(), ProviderError> {
        if let Some(gate) = &self.gate {
            gate.started.notify_one();
            gate.release.notified().await;
        }

        self.calls.lock().push(Call {
            name: self.name.clone(),
            op,
        });

        match &self.failure {
            Some(message) => Err(ProviderError::Provider(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn create(&self) -> Result<(), ProviderError> {
        self.record(Op::Create).await
    }

    async fn destroy(&self) -> Result<(), ProviderError> {
        self.record(Op::Destroy).await
    }

    async fn lookup(&self) -> Result<Vec<String>, ProviderError> {
        Ok(Vec::new())
    }
}

// ---- client stubs; the mock factory never touches them ----

pub struct StubRuntime {
    /// scripted log bytes per container name
    pub logs: Mutex<HashMap<String, VecDeque<Vec<u8>>>>,
    pub log_calls: Mutex<Vec<(String, LogStreamOptions)>>,
}

impl StubRuntime {
    pub fn new() -> Self {
        Self {
            logs: Mutex::new(HashMap::new()),
            log_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn script_logs(&self, container: &str, bytes: Vec<u8>) {
        self.logs
            .lock()
            .entry(container.to_string())
            .or_default()
            .push_back(bytes);
    }
}

impl Default for StubRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContainerRuntime for StubRuntime {
    async fn pull_image(&self, _image: &Image) -> Result<(), ClientError> {
        Ok(())
    }

    async fn create_network(&self, _name: &str, _subnet: &str) -> Result<String, ClientError> {
        Ok(String::new())
    }

    async fn remove_network(&self, _name: &str) -> Result<(), ClientError> {
        Ok(())
    }

    async fn find_network(&self, _name: &str) -> Result<Option<String>, ClientError> {
        Ok(None)
    }

    async fn create_container(&self, _config: &ContainerConfig) -> Result<String, ClientError> {
        Ok(String::new())
    }

    async fn remove_container(&self, _name: &str) -> Result<(), ClientError> {
        Ok(())
    }

    async fn find_container(&self, _name: &str) -> Result<Option<String>, ClientError> {
        Ok(None)
    }

    async fn container_logs(
        &self,
        name: &str,
        options: LogStreamOptions,
    ) -> Result<LogFrameStream, ClientError> {
        self.log_calls.lock().push((name.to_string(), options));

        let bytes = self
            .logs
            .lock()
            .get_mut(name)
            .and_then(|queue| queue.pop_front())
            .ok_or_else(|| ClientError::NotFound(name.to_string()))?;

        Ok(drydock_engine::logs::FrameDecoder::new(std::io::Cursor::new(bytes)).into_stream())
    }
}

pub struct StubCommand;

#[async_trait]
impl CommandRunner for StubCommand {
    async fn run(
        &self,
        _program: &str,
        _args: &[&str],
        _env: &[(String, String)],
    ) -> Result<CommandOutput, ClientError> {
        Ok(CommandOutput {
            success: true,
            ..Default::default()
        })
    }
}

pub struct StubHttp;

#[async_trait]
impl HttpChecker for StubHttp {
    async fn wait_healthy(&self, _url: &str, _timeout: Duration) -> Result<(), ClientError> {
        Ok(())
    }
}

pub fn stub_clients() -> Clients {
    Clients {
        runtime: Arc::new(StubRuntime::new()),
        command: Arc::new(StubCommand),
        http: Arc::new(StubHttp),
    }
}

pub fn clients_with_runtime(runtime: Arc<StubRuntime>) -> Clients {
    Clients {
        runtime,
        command: Arc::new(StubCommand),
        http: Arc::new(StubHttp),
    }
}

/// Async sink collecting everything written into a shared buffer.
#[derive(Clone, Default)]
pub struct TestWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl TestWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock()).to_string()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.lock().is_empty()
    }
}

impl tokio::io::AsyncWrite for TestWriter {
    fn poll_write(
        self: std::pin::Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
        buf: &[u8],
    ) -> std::task::Poll<std::io::Result<usize>> {
        self.buffer.lock().extend_from_slice(buf);
        std::task::Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(
        self: std::pin::Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn poll_shutdown(
        self: std::pin::Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        std::task::Poll::Ready(Ok(()))
    }
}
