//! Multi-stream log multiplexer
//!
//! Tails container output from many sources concurrently and merges it
//! into a single stdout/stderr pair. Each source runs in its own task;
//! a shared lock on each sink keeps one frame's bytes contiguous in the
//! output. An individual stream failing ends that stream and nothing
//! else.

pub mod frame;

pub use frame::{encode_frame, FrameDecoder};

use std::collections::BTreeSet;
use std::sync::Arc;

use futures::StreamExt;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use drydock_core::specs::ClusterSpec;
use drydock_core::{strip_fqdn_suffix, Resource, ResourceSet, ResourceType, Status};
use drydock_ports::{ContainerRuntime, LogFrameStream, LogStreamOptions, StreamKind};

use crate::error::{EngineError, Result};

pub struct LogMultiplexer {
    runtime: Arc<dyn ContainerRuntime>,
}

impl LogMultiplexer {
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self { runtime }
    }

    /// Tail logs for the named resources, or for every default-tailable
    /// resource when `targets` is empty. Returns when all streams have
    /// terminated. Fails up front on a target that resolves to nothing,
    /// and afterwards only if not a single stream could be opened.
    pub async fn tail<O, E>(
        &self,
        targets: &[String],
        set: &ResourceSet,
        stdout: O,
        stderr: E,
    ) -> Result<()>
    where
        O: AsyncWrite + Send + Unpin + 'static,
        E: AsyncWrite + Send + Unpin + 'static,
    {
        let containers = if targets.is_empty() {
            default_log_targets(set)
        } else {
            resolve_targets(targets, set)?
        };

        if containers.is_empty() {
            debug!("nothing to tail");
            return Ok(());
        }

        let stdout = Arc::new(Mutex::new(stdout));
        let stderr = Arc::new(Mutex::new(stderr));

        let mut tasks = JoinSet::new();
        let mut opened = 0usize;

        for container in containers {
            let stream = match self
                .runtime
                .container_logs(&container, LogStreamOptions::default())
                .await
            {
                Ok(s) => s,
                Err(e) => {
                    warn!(container = %container, error = %e, "unable to open log stream");
                    continue;
                }
            };

            opened += 1;
            tasks.spawn(pump(container, stream, stdout.clone(), stderr.clone()));
        }

        if opened == 0 {
            return Err(EngineError::NoStreams);
        }

        while tasks.join_next().await.is_some() {}
        Ok(())
    }
}

/// Copy one frame stream to the shared sinks, prefixing every write.
async fn pump<O, E>(
    container: String,
    mut stream: LogFrameStream,
    stdout: Arc<Mutex<O>>,
    stderr: Arc<Mutex<E>>,
) where
    O: AsyncWrite + Send + Unpin + 'static,
    E: AsyncWrite + Send + Unpin + 'static,
{
    let prefix = format!("[{}]   ", strip_fqdn_suffix(&container));

    while let Some(item) = stream.next().await {
        let frame = match item {
            Ok(frame) => frame,
            Err(e) => {
                warn!(container = %container, error = %e, "log stream ended");
                return;
            }
        };

        let mut line = Vec::with_capacity(prefix.len() + frame.payload.len());
        line.extend_from_slice(prefix.as_bytes());
        line.extend_from_slice(&frame.payload);

        // hold the sink lock across the whole write so frames from
        // concurrent streams never interleave
        let written = match frame.kind {
            StreamKind::Stdout => stdout.lock().await.write_all(&line).await,
            StreamKind::Stderr => stderr.lock().await.write_all(&line).await,
        };

        if let Err(e) = written {
            warn!(container = %container, error = %e, "log sink closed");
            return;
        }
    }
}

/// The containers a bare `log` invocation tails: every enabled
/// container and image cache, each nomad server and indexed client,
/// and each k8s server. Deduplicated by name, declaration order kept.
fn default_log_targets(set: &ResourceSet) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut names = Vec::new();

    for resource in set.iter() {
        if resource.disabled || resource.status == Status::Disabled {
            continue;
        }

        for name in container_names(resource) {
            if seen.insert(name.clone()) {
                names.push(name);
            }
        }
    }

    names
}

/// Resolve explicit FQDN arguments, erroring on any that match nothing.
fn resolve_targets(targets: &[String], set: &ResourceSet) -> Result<Vec<String>> {
    let mut seen = BTreeSet::new();
    let mut names = Vec::new();

    for target in targets {
        let resource = set
            .find_by_fqdn(target)
            .ok_or_else(|| EngineError::UnknownResource(target.clone()))?;

        for name in container_names(resource) {
            if seen.insert(name.clone()) {
                names.push(name);
            }
        }
    }

    Ok(names)
}

/// The runtime container names behind one resource.
fn container_names(resource: &Resource) -> Vec<String> {
    match resource.rtype {
        ResourceType::Container | ResourceType::ImageCache => vec![resource.fqdn()],
        ResourceType::K8sCluster => vec![resource.cluster_server_name()],
        ResourceType::NomadCluster => {
            let clients = resource
                .spec::<ClusterSpec>()
                .map(|s| s.client_nodes)
                .unwrap_or(0);

            let mut names = vec![resource.cluster_server_name()];
            names.extend((1..=clients).map(|i| resource.cluster_client_name(i)));
            names
        }
        _ => Vec::new(),
    }
}
