//! Container runtime seam
//!
//! Operations the providers and the log multiplexer need from the local
//! container runtime. The production adapter wraps the Docker API; tests
//! substitute in-memory fakes.

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use drydock_core::specs::{Image, NetworkAttachment, Port, Volume};

use crate::error::ClientError;

/// Runtime-level description of a container to create. Providers build
/// this from their typed specs; names are full FQDNs.
#[derive(Debug, Clone, Default)]
pub struct ContainerConfig {
    pub name: String,
    pub image: Image,
    pub command: Vec<String>,
    pub env: Vec<String>,
    pub volumes: Vec<Volume>,
    pub ports: Vec<Port>,
    pub networks: Vec<NetworkAttachment>,
    pub privileged: bool,
}

/// Which half of the multiplexed log stream a frame belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

/// One decoded frame of container output.
#[derive(Debug, Clone, PartialEq)]
pub struct LogFrame {
    pub kind: StreamKind,
    pub payload: Vec<u8>,
}

/// Options for opening a log stream.
#[derive(Debug, Clone, PartialEq)]
pub struct LogStreamOptions {
    pub follow: bool,
    pub tail: usize,
    pub stdout: bool,
    pub stderr: bool,
}

impl Default for LogStreamOptions {
    fn default() -> Self {
        Self {
            follow: true,
            tail: 40,
            stdout: true,
            stderr: true,
        }
    }
}

pub type LogFrameStream = Pin<Box<dyn Stream<Item = std::io::Result<LogFrame>> + Send>>;

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Pull an image if it is not present locally.
    async fn pull_image(&self, image: &Image) -> Result<(), ClientError>;

    /// Create a bridge network with the given subnet; returns the
    /// runtime's network id.
    async fn create_network(&self, name: &str, subnet: &str) -> Result<String, ClientError>;

    async fn remove_network(&self, name: &str) -> Result<(), ClientError>;

    /// Look up a network by name; `None` when it does not exist.
    async fn find_network(&self, name: &str) -> Result<Option<String>, ClientError>;

    /// Create and start a container; returns the runtime's container id.
    async fn create_container(&self, config: &ContainerConfig) -> Result<String, ClientError>;

    /// Stop and remove a container. Succeeds when the container is
    /// already gone.
    async fn remove_container(&self, name: &str) -> Result<(), ClientError>;

    /// Look up a container by name; `None` when it does not exist.
    async fn find_container(&self, name: &str) -> Result<Option<String>, ClientError>;

    /// Open a (possibly follow-mode) log stream for a container.
    async fn container_logs(
        &self,
        name: &str,
        options: LogStreamOptions,
    ) -> Result<LogFrameStream, ClientError>;
}
