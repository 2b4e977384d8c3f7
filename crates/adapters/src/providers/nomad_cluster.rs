//! Nomad cluster provider
//!
//! One server container plus `client_nodes` client containers, named
//! `server.<fqdn>` and `<i>.client.<fqdn>` so the log tailer can find
//! them by convention.

use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use drydock_core::specs::{ClusterSpec, Image, Port};
use drydock_core::Resource;
use drydock_ports::{Clients, ContainerConfig, Provider, ProviderError};

const DEFAULT_IMAGE: &str = "multani/nomad";
const DEFAULT_VERSION: &str = "1.6.1";
const HTTP_PORT: &str = "4646";
const STARTUP_TIMEOUT: Duration = Duration::from_secs(120);

pub struct NomadClusterProvider {
    resource: Resource,
    spec: ClusterSpec,
    clients: Clients,
}

impl NomadClusterProvider {
    pub fn new(resource: Resource, spec: ClusterSpec, clients: Clients) -> Self {
        Self {
            resource,
            spec,
            clients,
        }
    }

    fn image(&self) -> Image {
        let version = self.spec.version.as_deref().unwrap_or(DEFAULT_VERSION);
        Image {
            name: format!("{DEFAULT_IMAGE}:{version}"),
            ..Default::default()
        }
    }

    fn container_names(&self) -> Vec<String> {
        let mut names = vec![self.resource.cluster_server_name()];
        names.extend((1..=self.spec.client_nodes).map(|i| self.resource.cluster_client_name(i)));
        names
    }
}

#[async_trait]
impl Provider for NomadClusterProvider {
    async fn create(&self) -> Result<(), ProviderError> {
        info!(
            reference = %self.resource.fqdn(),
            clients = self.spec.client_nodes,
            "creating nomad cluster"
        );

        let image = self.image();
        self.clients.runtime.pull_image(&image).await?;

        let env: Vec<String> = self
            .spec
            .env
            .iter()
            .map(|e| format!("{}={}", e.key, e.value))
            .collect();

        let server = ContainerConfig {
            name: self.resource.cluster_server_name(),
            image: image.clone(),
            command: vec![
                "agent".to_string(),
                "-server".to_string(),
                "-bootstrap-expect=1".to_string(),
            ],
            env: env.clone(),
            ports: vec![Port {
                local: HTTP_PORT.to_string(),
                host: None,
            }],
            networks: self.spec.networks.clone(),
            privileged: true,
            ..Default::default()
        };
        self.clients.runtime.create_container(&server).await?;

        self.clients
            .http
            .wait_healthy(
                &format!("http://localhost:{HTTP_PORT}/v1/status/leader"),
                STARTUP_TIMEOUT,
            )
            .await?;

        let server_address = self.resource.cluster_server_name();
        for index in 1..=self.spec.client_nodes {
            let client = ContainerConfig {
                name: self.resource.cluster_client_name(index),
                image: image.clone(),
                command: vec![
                    "agent".to_string(),
                    "-client".to_string(),
                    format!("-servers={server_address}"),
                ],
                env: env.clone(),
                networks: self.spec.networks.clone(),
                privileged: true,
                ..Default::default()
            };
            self.clients.runtime.create_container(&client).await?;
        }

        Ok(())
    }

    async fn destroy(&self) -> Result<(), ProviderError> {
        info!(reference = %self.resource.fqdn(), "destroying nomad cluster");

        // clients first, then the server
        for name in self.container_names().into_iter().rev() {
            self.clients.runtime.remove_container(&name).await?;
        }

        Ok(())
    }

    async fn lookup(&self) -> Result<Vec<String>, ProviderError> {
        let mut ids = Vec::new();
        for name in self.container_names() {
            if let Some(id) = self.clients.runtime.find_container(&name).await? {
                ids.push(id);
            }
        }
        Ok(ids)
    }
}
